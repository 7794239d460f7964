//! Models module
//!
//! Defines the records, dimensions and fact rows that flow through the
//! normalization pipeline, plus the relation definitions the stores write.

pub mod column;
pub mod dimension;
pub mod fact;
pub mod record;
pub mod table;

pub use column::{Column, ColumnType, quote_identifier};
pub use dimension::{
    Dimension, DimensionColumn, DimensionDefinition, DimensionRow, ReferenceDimension,
    ReferenceRow, SurrogateKey,
};
pub use fact::{ChildFact, ChildLayout, FactColumn, FactValue, ParentFact, ParentLayout};
pub use record::{NaturalKey, RawRecord, RecordLayout};
pub use table::{CellValue, Row, TableDef};
