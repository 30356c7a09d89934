//! The predicate compiler.
//!
//! Turns a `FilterSpec` into a `PredicateNode` tree against a schema
//! registry, resolving dotted field paths through join-alias chains.
//!
//! Column resolution failures are recoverable: the offending node is skipped
//! with a warning and compilation continues. An unknown *root* table makes
//! the whole compilation yield no predicate.

use crate::filter::{FieldValue, FilterNode, FilterSpec};
use crate::predicate::{ColumnRef, Comparison, PredicateNode, ValuePredicate};
use crate::registry::SchemaRegistry;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use rill_core::{Error, Result};

/// Compiles a filter specification against a schema registry.
///
/// Returns `None` when the root table is unknown, the specification is
/// absent or empty, or recursion yields no predicates.
pub fn compile(
    registry: &SchemaRegistry,
    table_name: &str,
    spec: Option<&FilterSpec>,
) -> Option<PredicateNode> {
    PredicateCompiler::new(registry, table_name, spec).predicate()
}

/// Scope for compiling inside a nested specification: the joined table the
/// columns resolve against, and the context identifier the next join hop is
/// formed from.
struct NestedScope {
    table: String,
    context: String,
}

/// The predicate compiler: schema registry, root table, specification.
pub struct PredicateCompiler<'a> {
    registry: &'a SchemaRegistry,
    table_name: &'a str,
    spec: Option<&'a FilterSpec>,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        table_name: &'a str,
        spec: Option<&'a FilterSpec>,
    ) -> Self {
        Self {
            registry,
            table_name,
            spec,
        }
    }

    /// Compiles the specification into a predicate tree.
    pub fn predicate(&self) -> Option<PredicateNode> {
        self.registry.get(self.table_name)?;
        let spec = self.spec?;

        let mut predicates = self.normalize(spec, None);
        match predicates.len() {
            0 => None,
            1 => Some(predicates.remove(0)),
            _ => Some(PredicateNode::And(predicates)),
        }
    }

    /// Returns the JSON-serialized specification when it compiles to a
    /// predicate, the empty string otherwise. A debugging aid, not a
    /// canonical predicate representation.
    pub fn describe(&self) -> String {
        match (self.predicate(), self.spec) {
            (Some(_), Some(spec)) => spec.to_json().to_string(),
            _ => String::new(),
        }
    }

    fn normalize(&self, spec: &FilterSpec, scope: Option<&NestedScope>) -> Vec<PredicateNode> {
        let mut predicates = Vec::new();

        for node in spec.nodes() {
            match node {
                FilterNode::And(children) => {
                    let compiled = self.normalize_children(children, scope);
                    if !compiled.is_empty() {
                        predicates.push(PredicateNode::And(compiled));
                    }
                }
                FilterNode::Or(children) => {
                    let compiled = self.normalize_children(children, scope);
                    if !compiled.is_empty() {
                        predicates.push(PredicateNode::Or(compiled));
                    }
                }
                FilterNode::Not(children) => {
                    // Unary: negate the first compiled child, ignore the rest
                    let mut compiled = self.normalize_children(children, scope);
                    if !compiled.is_empty() {
                        predicates.push(PredicateNode::Not(Box::new(compiled.remove(0))));
                    }
                }
                FilterNode::Field { path, value } => match value {
                    FieldValue::Nested(sub) => {
                        let context = scope.map(|s| s.context.as_str()).unwrap_or(self.table_name);
                        let alias = format!("{}@{}", context, path);
                        match self.registry.get(&alias) {
                            None => log::warn!(
                                "failed to build predicate: {}",
                                Error::table_not_found(alias)
                            ),
                            Some(def) => {
                                let next = NestedScope {
                                    context: def
                                        .context_name()
                                        .unwrap_or(alias.as_str())
                                        .to_string(),
                                    table: alias,
                                };
                                let compiled = self.normalize(sub, Some(&next));
                                if !compiled.is_empty() {
                                    predicates.push(conjoin(compiled));
                                }
                            }
                        }
                    }
                    FieldValue::Literal(value) => {
                        self.push_leaf(&mut predicates, path, Comparison::Eq(value.clone()), scope)
                    }
                    FieldValue::Op(comparison) => {
                        self.push_leaf(&mut predicates, path, comparison.clone(), scope)
                    }
                },
            }
        }

        predicates
    }

    /// Compiles each child specification to a single predicate (its own
    /// nodes conjoined). Children yielding no predicate are dropped.
    fn normalize_children(
        &self,
        children: &[FilterSpec],
        scope: Option<&NestedScope>,
    ) -> Vec<PredicateNode> {
        children
            .iter()
            .filter_map(|child| {
                let compiled = self.normalize(child, scope);
                if compiled.is_empty() {
                    None
                } else {
                    Some(conjoin(compiled))
                }
            })
            .collect()
    }

    fn push_leaf(
        &self,
        out: &mut Vec<PredicateNode>,
        path: &str,
        comparison: Comparison,
        scope: Option<&NestedScope>,
    ) {
        match self.resolve_column(path, scope) {
            Ok(column) => out.push(PredicateNode::Leaf(ValuePredicate::new(column, comparison))),
            Err(err) => log::warn!("failed to build predicate: {}", err),
        }
    }

    /// Resolves a field path to a column. Inside a nested scope the path is
    /// a plain column name on the scope's table; at the top level a dotted
    /// path walks the alias chain with all but the last segment as join
    /// hops.
    fn resolve_column(&self, path: &str, scope: Option<&NestedScope>) -> Result<ColumnRef> {
        let (table_name, column_name) = if let Some(scope) = scope {
            (scope.table.clone(), path)
        } else {
            let segments: Vec<&str> = path.split('.').collect();
            if segments.len() == 1 {
                (self.table_name.to_string(), path)
            } else {
                let column = segments[segments.len() - 1];
                let alias = self.alias_table(&segments[..segments.len() - 1])?;
                (alias, column)
            }
        };

        let def = self
            .registry
            .get(&table_name)
            .ok_or_else(|| Error::table_not_found(table_name.clone()))?;
        let index = def
            .table()
            .get_column_index(column_name)
            .ok_or_else(|| Error::column_not_found(table_name.clone(), column_name))?;

        Ok(ColumnRef::new(table_name, column_name, index))
    }

    /// Walks a sequence of join hops to the aliased table they denote.
    ///
    /// Starting from the root identifier, each hop forms `{context}@{hop}`;
    /// the alias's `context_name` becomes the context for the next hop.
    fn alias_table(&self, hops: &[&str]) -> Result<String> {
        let mut context = self.table_name.to_string();
        let mut resolved = self.table_name.to_string();
        for hop in hops {
            resolved = format!("{}@{}", context, hop);
            let def = self
                .registry
                .get(&resolved)
                .ok_or_else(|| Error::table_not_found(resolved.clone()))?;
            context = def.context_name().unwrap_or(resolved.as_str()).to_string();
        }
        Ok(resolved)
    }
}

fn conjoin(mut predicates: Vec<PredicateNode>) -> PredicateNode {
    if predicates.len() == 1 {
        predicates.remove(0)
    } else {
        PredicateNode::And(predicates)
    }
}
