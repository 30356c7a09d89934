//! Subscription management for live query streams.
//!
//! This module provides subscription IDs and a manager for tracking active
//! subscriptions. Subscriptions are stored in insertion order and notified
//! in that order, which keeps cross-stream tie-breaking deterministic.

use alloc::boxed::Box;
use alloc::vec::Vec;
use rill_core::Row;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for snapshot notifications.
pub type RowsCallback = Box<dyn Fn(&[Row])>;

/// A subscription to a live stream.
pub struct Subscription {
    /// Unique identifier
    id: SubscriptionId,
    /// Callback to invoke on emissions
    callback: RowsCallback,
    /// Whether this subscription is active
    active: bool,
}

impl Subscription {
    /// Creates a new subscription.
    pub fn new<F>(id: SubscriptionId, callback: F) -> Self
    where
        F: Fn(&[Row]) + 'static,
    {
        Self::from_boxed(id, Box::new(callback))
    }

    /// Creates a new subscription from an already boxed callback.
    pub fn from_boxed(id: SubscriptionId, callback: RowsCallback) -> Self {
        Self {
            id,
            callback,
            active: true,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether this subscription is active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivates this subscription.
    #[inline]
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Notifies this subscription of an emission.
    pub fn notify(&self, rows: &[Row]) {
        if self.active {
            (self.callback)(rows);
        }
    }
}

/// Manages subscriptions for a live stream.
///
/// Subscribers are kept in insertion order; `notify_all` walks them in that
/// order.
pub struct SubscriptionManager {
    /// Active subscriptions in insertion order
    subscriptions: Vec<Subscription>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 1,
        }
    }

    /// Subscribes with the given callback.
    ///
    /// Returns the subscription ID that can be used to unsubscribe.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&[Row]) + 'static,
    {
        self.subscribe_boxed(Box::new(callback))
    }

    /// Subscribes with an already boxed callback.
    pub fn subscribe_boxed(&mut self, callback: RowsCallback) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;

        self.subscriptions.push(Subscription::from_boxed(id, callback));

        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let len_before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id() != id);
        self.subscriptions.len() < len_before
    }

    /// Notifies a specific subscription.
    pub fn notify(&self, id: SubscriptionId, rows: &[Row]) {
        if let Some(subscription) = self.subscriptions.iter().find(|s| s.id() == id) {
            subscription.notify(rows);
        }
    }

    /// Notifies all active subscriptions in insertion order.
    pub fn notify_all(&self, rows: &[Row]) {
        for subscription in &self.subscriptions {
            subscription.notify(rows);
        }
    }

    /// Returns the number of subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}
