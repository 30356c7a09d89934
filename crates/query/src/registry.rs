//! Schema registry with join-alias chains.
//!
//! The registry maps table identifiers to table definitions. An identifier
//! is either a root table name or an alias of the form `root@path` denoting
//! a join hop. Aliased entries carry a `context_name` — the identifier the
//! alias was formed from — so dotted field paths can walk backwards through
//! the chain one hop per path segment.

use alloc::string::{String, ToString};
use hashbrown::HashMap;
use rill_core::schema::Table;

/// A table definition as known to the registry.
#[derive(Clone, Debug)]
pub struct TableDef {
    /// The table schema.
    table: Table,
    /// For aliased entries, the identifier this alias was formed from.
    context_name: Option<String>,
}

impl TableDef {
    /// Creates a root table definition.
    pub fn new(table: Table) -> Self {
        Self {
            table,
            context_name: None,
        }
    }

    /// Creates an aliased table definition.
    pub fn aliased(table: Table, context_name: impl Into<String>) -> Self {
        Self {
            table,
            context_name: Some(context_name.into()),
        }
    }

    /// Returns the table schema.
    #[inline]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Returns the context identifier for aliased entries.
    #[inline]
    pub fn context_name(&self) -> Option<&str> {
        self.context_name.as_deref()
    }
}

/// Registry of tables and join aliases, supplied by the schema-definition
/// subsystem and consumed by the predicate compiler.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableDef>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Registers a root table under its own name.
    pub fn register(&mut self, table: Table) {
        self.tables
            .insert(table.name().to_string(), TableDef::new(table));
    }

    /// Registers a join alias (`root@path`) with its context identifier.
    pub fn register_alias(
        &mut self,
        alias: impl Into<String>,
        table: Table,
        context_name: impl Into<String>,
    ) {
        self.tables
            .insert(alias.into(), TableDef::aliased(table, context_name));
    }

    /// Looks up a table definition by identifier.
    pub fn get(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// Returns true if the identifier is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns the number of registered identifiers.
    #[inline]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if no identifiers are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
