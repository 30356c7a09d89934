//! Rill Core - Core types and schema definitions for the rill reactive query
//! system.
//!
//! This crate provides the foundational types shared by the predicate
//! compiler and the query-token algebra:
//!
//! - `DataType`: Supported data types (Boolean, Int32, Int64, Float64, String, DateTime)
//! - `Value`: Runtime values that can appear in a result row
//! - `Row`: A row of values with a unique identifier
//! - `schema`: Schema definitions (Column, Table, TableBuilder)
//! - `pattern_match`: Pattern matching for the `$match`/`$has` operators
//! - `Error`: Error types shared across the workspace
//!
//! # Example
//!
//! ```rust
//! use rill_core::{DataType, Value, Row};
//! use rill_core::schema::TableBuilder;
//!
//! // Create a table schema
//! let table = TableBuilder::new("users")
//!     .unwrap()
//!     .add_column("id", DataType::Int64)
//!     .unwrap()
//!     .add_column("name", DataType::String)
//!     .unwrap()
//!     .build();
//!
//! // Create a row
//! let row = Row::new(1, vec![
//!     Value::Int64(1),
//!     Value::String("Alice".into()),
//! ]);
//!
//! assert_eq!(row.id(), 1);
//! assert_eq!(row.get(1), Some(&Value::String("Alice".into())));
//! assert!(table.get_column("name").is_some());
//! ```

#![no_std]

extern crate alloc;

mod error;
pub mod pattern_match;
mod row;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use row::{next_row_id, set_next_row_id, Row, RowId};
pub use types::DataType;
pub use value::Value;
