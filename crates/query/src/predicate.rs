//! Predicate definitions for compiled filter specifications.
//!
//! The compiler output is a `PredicateNode` tree: leaf predicates (a
//! resolved column plus a comparison) combined by AND/OR/NOT nodes. The
//! comparison vocabulary is a closed enumeration, so an unrecognized
//! operator is unrepresentable.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use rill_core::pattern_match;
use rill_core::{Row, Value};

/// A resolved reference to a schema column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRef {
    /// Identifier of the table (root name or join alias).
    pub table: String,
    /// Column name.
    pub name: String,
    /// Column index within the table.
    pub index: usize,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, name: impl Into<String>, index: usize) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            index,
        }
    }
}

/// The closed comparison vocabulary for leaf predicates.
///
/// `Between` is inclusive on both bounds. `Match`/`NotMatch` carry a regex
/// pattern, `Has` a literal word. `Eq` exists for compiled equality leaves;
/// filter specifications express equality through literal values.
#[derive(Clone, Debug, PartialEq)]
pub enum Comparison {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Le(Value),
    Gt(Value),
    Ge(Value),
    Match(String),
    NotMatch(String),
    Between(Value, Value),
    Has(String),
    In(Vec<Value>),
    IsNull,
    IsNotNull,
}

/// A leaf predicate comparing a column to its operand.
#[derive(Clone, Debug, PartialEq)]
pub struct ValuePredicate {
    pub column: ColumnRef,
    pub comparison: Comparison,
}

impl ValuePredicate {
    pub fn new(column: ColumnRef, comparison: Comparison) -> Self {
        Self { column, comparison }
    }

    pub fn eq(column: ColumnRef, value: Value) -> Self {
        Self::new(column, Comparison::Eq(value))
    }

    pub fn ne(column: ColumnRef, value: Value) -> Self {
        Self::new(column, Comparison::Ne(value))
    }

    pub fn lt(column: ColumnRef, value: Value) -> Self {
        Self::new(column, Comparison::Lt(value))
    }

    pub fn le(column: ColumnRef, value: Value) -> Self {
        Self::new(column, Comparison::Le(value))
    }

    pub fn gt(column: ColumnRef, value: Value) -> Self {
        Self::new(column, Comparison::Gt(value))
    }

    pub fn ge(column: ColumnRef, value: Value) -> Self {
        Self::new(column, Comparison::Ge(value))
    }

    /// Evaluates the predicate against a row.
    pub fn eval(&self, row: &Row) -> bool {
        let row_value = match row.get(self.column.index) {
            Some(v) => v,
            None => return false,
        };

        match &self.comparison {
            Comparison::Eq(v) => row_value == v,
            Comparison::Ne(v) => row_value != v,
            Comparison::Lt(v) => row_value < v,
            Comparison::Le(v) => row_value <= v,
            Comparison::Gt(v) => row_value > v,
            Comparison::Ge(v) => row_value >= v,
            Comparison::Match(pattern) => row_value
                .as_str()
                .map(|s| pattern_match::regex(s, pattern))
                .unwrap_or(false),
            Comparison::NotMatch(pattern) => row_value
                .as_str()
                .map(|s| !pattern_match::regex(s, pattern))
                .unwrap_or(false),
            Comparison::Between(low, high) => low <= row_value && row_value <= high,
            Comparison::Has(word) => row_value
                .as_str()
                .map(|s| pattern_match::has_word(s, word))
                .unwrap_or(false),
            Comparison::In(values) => values.contains(row_value),
            Comparison::IsNull => row_value.is_null(),
            Comparison::IsNotNull => !row_value.is_null(),
        }
    }
}

/// A compiled predicate tree.
#[derive(Clone, Debug, PartialEq)]
pub enum PredicateNode {
    /// A leaf comparison.
    Leaf(ValuePredicate),
    /// Conjunction of all children.
    And(Vec<PredicateNode>),
    /// Disjunction of all children.
    Or(Vec<PredicateNode>),
    /// Negation of a single child.
    Not(Box<PredicateNode>),
}

impl PredicateNode {
    /// Evaluates the predicate tree against a row.
    pub fn eval(&self, row: &Row) -> bool {
        match self {
            PredicateNode::Leaf(p) => p.eval(row),
            PredicateNode::And(children) => children.iter().all(|p| p.eval(row)),
            PredicateNode::Or(children) => children.iter().any(|p| p.eval(row)),
            PredicateNode::Not(child) => !child.eval(row),
        }
    }

    /// Returns the columns referenced by this predicate tree.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        match self {
            PredicateNode::Leaf(p) => alloc::vec![&p.column],
            PredicateNode::And(children) | PredicateNode::Or(children) => {
                children.iter().flat_map(|p| p.columns()).collect()
            }
            PredicateNode::Not(child) => child.columns(),
        }
    }

    /// Returns the tables referenced by this predicate tree.
    pub fn tables(&self) -> Vec<&str> {
        self.columns().iter().map(|c| c.table.as_str()).collect()
    }
}
