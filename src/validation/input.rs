//! Input validation and sanitization utilities.
//!
//! Configured table and column names end up inside SQL statements, so they
//! are checked here before any store is touched. Header-derived staging
//! column names are sanitized rather than rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for table names
pub const MAX_TABLE_NAME_LENGTH: usize = 63;

/// Maximum length for column names
pub const MAX_COLUMN_NAME_LENGTH: usize = 63;

/// Maximum length for staging attribute names
pub const MAX_ATTRIBUTE_NAME_LENGTH: usize = 255;

static NON_IDENTIFIER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("Invalid regex"));

/// Errors that can occur during input validation.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),

    /// Input is a reserved word
    #[error("{field} cannot be a reserved word: {word}")]
    ReservedWord { field: &'static str, word: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a target table name.
///
/// # Rules
///
/// - Must not be empty or exceed 63 characters
/// - Must start with a letter or underscore
/// - May contain ASCII letters, digits and underscores
/// - Cannot be a SQL reserved word
///
/// # Examples
///
/// ```
/// use nar_normalizer::validation::input::validate_table_name;
///
/// assert!(validate_table_name("street_type").is_ok());
/// assert!(validate_table_name("").is_err());
/// assert!(validate_table_name("1location").is_err());
/// assert!(validate_table_name("select").is_err());
/// ```
pub fn validate_table_name(name: &str) -> ValidationResult<()> {
    validate_identifier("table name", name, MAX_TABLE_NAME_LENGTH)?;

    if is_sql_reserved_word(name) {
        return Err(ValidationError::ReservedWord {
            field: "table name",
            word: name.to_string(),
        });
    }

    Ok(())
}

/// Validate a target column name.
///
/// Same rules as [`validate_table_name`].
pub fn validate_column_name(name: &str) -> ValidationResult<()> {
    validate_identifier("column name", name, MAX_COLUMN_NAME_LENGTH)?;

    if is_sql_reserved_word(name) {
        return Err(ValidationError::ReservedWord {
            field: "column name",
            word: name.to_string(),
        });
    }

    Ok(())
}

/// Validate a staging attribute name.
///
/// Attributes come from source headers, so reserved words are allowed;
/// they are always quoted when they reach SQL.
pub fn validate_attribute_name(name: &str) -> ValidationResult<()> {
    validate_identifier("attribute name", name, MAX_ATTRIBUTE_NAME_LENGTH)
}

fn validate_identifier(field: &'static str, name: &str, max: usize) -> ValidationResult<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(ValidationError::Empty(field));
    };

    if name.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: name.len(),
        });
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidFormat(
            field,
            "must start with a letter or underscore".to_string(),
        ));
    }

    if let Some(c) = name.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(ValidationError::InvalidCharacters {
            field,
            reason: format!("invalid character: '{}'", c),
        });
    }

    Ok(())
}

/// Turn a raw source header into a usable attribute name.
///
/// Surrounding whitespace is trimmed, every character outside
/// `[A-Za-z0-9_]` becomes `_`, and a leading digit gets a `_` prefix.
///
/// # Examples
///
/// ```
/// use nar_normalizer::validation::input::sanitize_attribute_name;
///
/// assert_eq!(sanitize_attribute_name("LOC GUID"), "LOC_GUID");
/// assert_eq!(sanitize_attribute_name(" BG-DLS QTR "), "BG_DLS_QTR");
/// assert_eq!(sanitize_attribute_name("1ST"), "_1ST");
/// ```
pub fn sanitize_attribute_name(header: &str) -> String {
    let replaced = NON_IDENTIFIER_CHARS.replace_all(header.trim(), "_");
    match replaced.chars().next() {
        None => "_".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{}", replaced),
        Some(_) => replaced.into_owned(),
    }
}

/// Check if a word is a SQL reserved word.
///
/// This is a basic check covering common reserved words across DuckDB and
/// PostgreSQL.
fn is_sql_reserved_word(word: &str) -> bool {
    const RESERVED_WORDS: &[&str] = &[
        "select",
        "from",
        "where",
        "insert",
        "update",
        "delete",
        "create",
        "drop",
        "alter",
        "table",
        "index",
        "view",
        "schema",
        "grant",
        "revoke",
        "commit",
        "rollback",
        "begin",
        "end",
        "primary",
        "foreign",
        "key",
        "references",
        "constraint",
        "unique",
        "check",
        "default",
        "not",
        "null",
        "and",
        "or",
        "in",
        "is",
        "case",
        "when",
        "then",
        "else",
        "as",
        "on",
        "join",
        "group",
        "by",
        "having",
        "order",
        "limit",
        "offset",
        "union",
        "all",
        "distinct",
        "values",
        "set",
        "into",
        "true",
        "false",
    ];

    let lower = word.to_lowercase();
    RESERVED_WORDS.contains(&lower.as_str())
}
