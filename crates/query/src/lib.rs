//! Rill Query - Predicate compiler for the rill reactive query system.
//!
//! This crate turns a declarative, nested filter specification into a
//! boolean predicate tree evaluable against a relational schema:
//!
//! - `filter`: Typed filter-specification tree (`FilterSpec`)
//! - `predicate`: Compiled predicate tree (`PredicateNode`) and the closed
//!   comparison vocabulary (`Comparison`)
//! - `registry`: Schema registry with `root@path` join aliases
//! - `compiler`: The compiler itself (`PredicateCompiler`, `compile`)
//!
//! # Example
//!
//! ```rust
//! use rill_core::{DataType, Row, Value};
//! use rill_core::schema::TableBuilder;
//! use rill_query::{compile, Comparison, FilterSpec, SchemaRegistry};
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(
//!     TableBuilder::new("users")
//!         .unwrap()
//!         .add_column("id", DataType::Int64)
//!         .unwrap()
//!         .add_column("age", DataType::Int64)
//!         .unwrap()
//!         .build(),
//! );
//!
//! let spec = FilterSpec::new().op("age", Comparison::Ge(Value::Int64(18)));
//! let predicate = compile(&registry, "users", Some(&spec)).unwrap();
//!
//! let adult = Row::new(1, vec![Value::Int64(1), Value::Int64(30)]);
//! let minor = Row::new(2, vec![Value::Int64(2), Value::Int64(12)]);
//! assert!(predicate.eval(&adult));
//! assert!(!predicate.eval(&minor));
//! ```

#![no_std]

extern crate alloc;

pub mod compiler;
pub mod filter;
pub mod predicate;
pub mod registry;

pub use compiler::{compile, PredicateCompiler};
pub use filter::{FieldValue, FilterNode, FilterSpec};
pub use predicate::{ColumnRef, Comparison, PredicateNode, ValuePredicate};
pub use registry::{SchemaRegistry, TableDef};
