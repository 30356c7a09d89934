//! Typed filter-specification tree.
//!
//! A `FilterSpec` is an ordered list of nodes; multiple nodes in one spec
//! form an implicit conjunction. A node is either a compound operator over
//! sub-specifications or a field path with a value. Value shapes — literal,
//! comparison, nested spec — are a closed enumeration, as is the comparison
//! vocabulary, so no structural sniffing is needed to tell them apart.
//!
//! Specs serialize to JSON with the `$`-prefixed operator keys (`$gte`,
//! `$and`, ...) as a debugging aid.

use crate::predicate::Comparison;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use rill_core::Value;
use serde_json::{Map, Value as Json};

/// One node of a filter specification.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterNode {
    /// Conjunction of sub-specifications.
    And(Vec<FilterSpec>),
    /// Disjunction of sub-specifications.
    Or(Vec<FilterSpec>),
    /// Negation. Only the first entry that compiles to a predicate is
    /// negated; further entries are ignored.
    Not(Vec<FilterSpec>),
    /// A field path (possibly dotted) with its value.
    Field { path: String, value: FieldValue },
}

/// The value attached to a field path.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A literal value; compiles to an equality predicate.
    Literal(Value),
    /// A comparison from the operator vocabulary.
    Op(Comparison),
    /// A nested specification; the field path denotes a joined table.
    Nested(FilterSpec),
}

/// A filter specification: an ordered list of nodes, conjoined implicitly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSpec {
    nodes: Vec<FilterNode>,
}

impl FilterSpec {
    /// Creates an empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the nodes in insertion order.
    #[inline]
    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    /// Returns true if the specification has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a node.
    pub fn push(&mut self, node: FilterNode) {
        self.nodes.push(node);
    }

    /// Adds a field with a literal value (equality).
    pub fn field(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.nodes.push(FilterNode::Field {
            path: path.into(),
            value: FieldValue::Literal(value.into()),
        });
        self
    }

    /// Adds a field with a comparison from the operator vocabulary.
    pub fn op(mut self, path: impl Into<String>, comparison: Comparison) -> Self {
        self.nodes.push(FilterNode::Field {
            path: path.into(),
            value: FieldValue::Op(comparison),
        });
        self
    }

    /// Adds a field with a nested specification (joined table).
    pub fn nested(mut self, path: impl Into<String>, spec: FilterSpec) -> Self {
        self.nodes.push(FilterNode::Field {
            path: path.into(),
            value: FieldValue::Nested(spec),
        });
        self
    }

    /// Adds a conjunction over sub-specifications.
    pub fn and(mut self, children: Vec<FilterSpec>) -> Self {
        self.nodes.push(FilterNode::And(children));
        self
    }

    /// Adds a disjunction over sub-specifications.
    pub fn or(mut self, children: Vec<FilterSpec>) -> Self {
        self.nodes.push(FilterNode::Or(children));
        self
    }

    /// Adds a negation over sub-specifications.
    pub fn not(mut self, children: Vec<FilterSpec>) -> Self {
        self.nodes.push(FilterNode::Not(children));
        self
    }

    /// Renders the specification as JSON.
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        for node in &self.nodes {
            match node {
                FilterNode::And(children) => {
                    map.insert("$and".into(), specs_json(children));
                }
                FilterNode::Or(children) => {
                    map.insert("$or".into(), specs_json(children));
                }
                FilterNode::Not(children) => {
                    map.insert("$not".into(), specs_json(children));
                }
                FilterNode::Field { path, value } => {
                    let json = match value {
                        FieldValue::Literal(v) => value_json(v),
                        FieldValue::Op(cmp) => {
                            let (key, operand) = comparison_json(cmp);
                            let mut op = Map::new();
                            op.insert(key.into(), operand);
                            Json::Object(op)
                        }
                        FieldValue::Nested(spec) => spec.to_json(),
                    };
                    map.insert(path.clone(), json);
                }
            }
        }
        Json::Object(map)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn specs_json(children: &[FilterSpec]) -> Json {
    Json::Array(children.iter().map(|s| s.to_json()).collect())
}

fn value_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int32(i) => Json::Number((*i as i64).into()),
        Value::Int64(i) => Json::Number((*i).into()),
        Value::Float64(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::DateTime(t) => Json::Number((*t).into()),
    }
}

fn comparison_json(comparison: &Comparison) -> (&'static str, Json) {
    match comparison {
        Comparison::Eq(v) => ("$eq", value_json(v)),
        Comparison::Ne(v) => ("$ne", value_json(v)),
        Comparison::Lt(v) => ("$lt", value_json(v)),
        Comparison::Le(v) => ("$lte", value_json(v)),
        Comparison::Gt(v) => ("$gt", value_json(v)),
        Comparison::Ge(v) => ("$gte", value_json(v)),
        Comparison::Match(p) => ("$match", Json::String(p.clone())),
        Comparison::NotMatch(p) => ("$notMatch", Json::String(p.clone())),
        Comparison::Between(low, high) => (
            "$between",
            Json::Array(alloc::vec![value_json(low), value_json(high)]),
        ),
        Comparison::Has(w) => ("$has", Json::String(w.clone())),
        Comparison::In(values) => ("$in", Json::Array(values.iter().map(value_json).collect())),
        Comparison::IsNull => ("$isNull", Json::Bool(true)),
        Comparison::IsNotNull => ("$isNotNull", Json::Bool(true)),
    }
}
