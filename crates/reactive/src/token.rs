//! Query tokens: immutable, value-like handles over deferred query results.
//!
//! A token's identity is its producer. Composition (`map`, `combine`,
//! `concat`) always yields a new token and never mutates an existing one;
//! tokens built from the same producer share its resolution, so a producer
//! runs at most once no matter how its tokens are consumed or combined.

use crate::changes::Changes;
use crate::handle::{HandleProducer, QueryHandle};
use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use rill_core::{Error, Result, Row};

/// Row transform attached by `map`, applied to every emitted row.
pub type RowTransform = Rc<dyn Fn(Row) -> Row>;

/// Distinguishes pairings built with `combine` from those built with
/// `concat`. Output shape and update rules are identical; the tag records
/// the sequential-precedence intent for downstream consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombineKind {
    /// Built with `combine`.
    Combined,
    /// Built with `concat`.
    Sequential,
}

/// Resolution state of a token's producer.
pub(crate) enum ProducerSlot {
    /// Not yet resolved; the producer is taken out exactly once.
    Pending(Option<HandleProducer>),
    /// Resolved successfully.
    Ready(Rc<dyn QueryHandle>),
    /// Resolution failed; the error is replayed to later consumers.
    Failed(Error),
}

#[derive(Clone)]
pub(crate) enum TokenSource {
    /// A leaf token over a deferred handle producer.
    Handle(Rc<RefCell<ProducerSlot>>),
    /// A derived token over two parents.
    Paired(Rc<PairedSource>),
}

pub(crate) struct PairedSource {
    pub(crate) left: QueryToken,
    pub(crate) right: QueryToken,
    pub(crate) kind: CombineKind,
}

/// An immutable handle over a lazily produced query result.
#[derive(Clone)]
pub struct QueryToken {
    source: TokenSource,
    transform: Option<RowTransform>,
}

impl QueryToken {
    /// Creates a token over a deferred handle producer.
    pub fn new<F>(producer: F) -> Self
    where
        F: FnOnce() -> Result<Rc<dyn QueryHandle>> + 'static,
    {
        Self {
            source: TokenSource::Handle(Rc::new(RefCell::new(ProducerSlot::Pending(Some(
                Box::new(producer),
            ))))),
            transform: None,
        }
    }

    /// Creates a token over an already resolved handle.
    pub fn from_handle(handle: Rc<dyn QueryHandle>) -> Self {
        Self {
            source: TokenSource::Handle(Rc::new(RefCell::new(ProducerSlot::Ready(handle)))),
            transform: None,
        }
    }

    /// One-shot retrieval: resolves the producer, takes exactly one
    /// snapshot, completes. For derived tokens both parents are read at the
    /// same point; a failed parent fails the whole call.
    pub fn values(&self) -> Result<Vec<Row>> {
        match &self.source {
            TokenSource::Handle(slot) => {
                let handle = resolve_slot(slot)?;
                Ok(apply_transform(&self.transform, handle.snapshot()))
            }
            TokenSource::Paired(pair) => {
                let mut rows = pair.left.values()?;
                rows.extend(pair.right.values()?);
                Ok(apply_transform(&self.transform, rows))
            }
        }
    }

    /// Returns the live stream of full result-set snapshots for this token.
    pub fn changes(&self) -> Changes {
        Changes::new(self.clone())
    }

    /// Resolves the producer and returns the handle's textual
    /// representation; derived tokens format their parents recursively.
    pub fn describe(&self) -> Result<String> {
        match &self.source {
            TokenSource::Handle(slot) => Ok(resolve_slot(slot)?.describe()),
            TokenSource::Paired(pair) => {
                let keyword = match pair.kind {
                    CombineKind::Combined => "combine",
                    CombineKind::Sequential => "concat",
                };
                Ok(format!(
                    "{}({}, {})",
                    keyword,
                    pair.left.describe()?,
                    pair.right.describe()?
                ))
            }
        }
    }

    /// Returns a new token whose emissions are replaced through `f`.
    ///
    /// Transforms compose left to right: a later `map` sees the output of
    /// earlier ones.
    pub fn map<F>(&self, f: F) -> QueryToken
    where
        F: Fn(Row) -> Row + 'static,
    {
        let transform: RowTransform = match &self.transform {
            Some(previous) => {
                let previous = previous.clone();
                Rc::new(move |row| f(previous(row)))
            }
            None => Rc::new(f),
        };
        QueryToken {
            source: self.source.clone(),
            transform: Some(transform),
        }
    }

    /// Returns a new token pairing `self` with `other`: its rows are
    /// `self`'s followed by `other`'s, and its stream re-emits whenever
    /// either side emits.
    pub fn combine(&self, other: &QueryToken) -> QueryToken {
        Self::paired(self, other, CombineKind::Combined)
    }

    /// Like `combine`, but records sequential-precedence intent.
    pub fn concat(&self, other: &QueryToken) -> QueryToken {
        Self::paired(self, other, CombineKind::Sequential)
    }

    /// Returns the pairing kind for derived tokens, `None` for leaf tokens.
    pub fn kind(&self) -> Option<CombineKind> {
        match &self.source {
            TokenSource::Paired(pair) => Some(pair.kind),
            TokenSource::Handle(_) => None,
        }
    }

    fn paired(left: &QueryToken, right: &QueryToken, kind: CombineKind) -> QueryToken {
        QueryToken {
            source: TokenSource::Paired(Rc::new(PairedSource {
                left: left.clone(),
                right: right.clone(),
                kind,
            })),
            transform: None,
        }
    }

    pub(crate) fn source(&self) -> &TokenSource {
        &self.source
    }

    pub(crate) fn transform(&self) -> Option<RowTransform> {
        self.transform.clone()
    }
}

/// Resolves a producer slot, memoizing the outcome.
pub(crate) fn resolve_slot(slot: &Rc<RefCell<ProducerSlot>>) -> Result<Rc<dyn QueryHandle>> {
    {
        let state = slot.borrow();
        match &*state {
            ProducerSlot::Ready(handle) => return Ok(handle.clone()),
            ProducerSlot::Failed(error) => return Err(error.clone()),
            ProducerSlot::Pending(_) => {}
        }
    }

    let producer = match &mut *slot.borrow_mut() {
        ProducerSlot::Pending(producer) => producer.take(),
        _ => None,
    };

    let result = match producer {
        Some(produce) => produce(),
        None => Err(Error::source_unavailable("producer already consumed")),
    };

    *slot.borrow_mut() = match &result {
        Ok(handle) => ProducerSlot::Ready(handle.clone()),
        Err(error) => ProducerSlot::Failed(error.clone()),
    };

    result
}

pub(crate) fn apply_transform(transform: &Option<RowTransform>, rows: Vec<Row>) -> Vec<Row> {
    match transform {
        Some(f) => rows.into_iter().map(|row| f(row)).collect(),
        None => rows,
    }
}
