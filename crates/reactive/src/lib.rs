//! Rill Reactive - Reactive query tokens for the rill query system.
//!
//! This crate implements a composable handle over a live query result set.
//! A `QueryToken` wraps a lazily produced query handle and supports one-shot
//! retrieval, continuous change notification, and structural composition
//! while preserving live-update correctness under composition.
//!
//! # Core Concepts
//!
//! - `QueryHandle`: The capability the external query engine supplies —
//!   a snapshot, a live-update subscription, and a textual representation
//! - `QueryToken`: An immutable, value-like handle over one deferred query
//!   handle producer, resolved at most once
//! - `Changes`: A multicast live stream of full result-set snapshots with
//!   replay-of-latest and reference-counted teardown
//!
//! # Key Features
//!
//! - `values()`: Resolve the producer, take exactly one snapshot, complete
//! - `changes()`: Initial snapshot followed by a refreshed snapshot per
//!   underlying mutation
//! - `map()`: Replace every emitted row through a transform; transforms
//!   compose left to right
//! - `combine()`/`concat()`: Positional concatenation of two tokens that
//!   re-emits on either side's updates, re-applying each side's transform
//!   on every emission
//!
//! # Example
//!
//! ```ignore
//! use rill_reactive::QueryToken;
//!
//! let token = QueryToken::new(|| engine.select("tasks"));
//! let adults = token.map(redact_email);
//!
//! // One-shot
//! let rows = adults.values()?;
//!
//! // Live
//! let changes = adults.combine(&other).changes();
//! let sub = changes.subscribe(|rows| render(rows))?;
//! // ...
//! changes.unsubscribe(sub);
//! ```

#![no_std]

extern crate alloc;

pub mod changes;
pub mod handle;
#[cfg(test)]
mod mock;
pub mod subscription;
pub mod token;

pub use changes::Changes;
pub use handle::{HandleProducer, QueryHandle};
pub use subscription::{RowsCallback, Subscription, SubscriptionId, SubscriptionManager};
pub use token::{CombineKind, QueryToken, RowTransform};

// Re-export commonly used types from dependencies
pub use rill_core::{Error, Result, Row};
