//! The query-handle capability consumed by tokens.
//!
//! A `QueryHandle` is supplied by the external query engine for a compiled
//! predicate. Tokens never construct handles; they wrap a deferred producer
//! and resolve it at most once.

use crate::subscription::{RowsCallback, SubscriptionId};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use rill_core::{Result, Row};

/// A live query result set.
///
/// Contract for `subscribe`: the current snapshot is delivered to the new
/// callback synchronously, then a full refreshed snapshot after every
/// underlying mutation. Handles are multicast — any number of subscribers
/// may attach, and `unsubscribe` removes exactly one of them.
pub trait QueryHandle {
    /// Returns the current result set.
    fn snapshot(&self) -> Vec<Row>;

    /// Subscribes to live updates (initial snapshot included).
    fn subscribe(&self, callback: RowsCallback) -> SubscriptionId;

    /// Removes a subscription. Returns true if it was attached.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Returns a textual representation of the query.
    fn describe(&self) -> String;
}

/// A deferred, possibly failing producer of a query handle.
///
/// Runs at most once per token lineage; both the handle and a failure are
/// memoized and replayed to later consumers.
pub type HandleProducer = Box<dyn FnOnce() -> Result<Rc<dyn QueryHandle>>>;
