//! Validation functionality
//!
//! Provides identifier validation for configured table, column and
//! attribute names, and sanitization of header-derived names.

pub mod input;

pub use input::{
    ValidationError, ValidationResult, sanitize_attribute_name, validate_attribute_name,
    validate_column_name, validate_table_name,
};
