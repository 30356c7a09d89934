//! Live change streams over query tokens.
//!
//! A `Changes` stream is multicast with replay-of-latest: the first
//! subscriber connects the upstream source (resolving the token's
//! producer), later subscribers immediately receive the latest emission,
//! and the upstream connection is torn down when the last subscriber
//! leaves. For paired tokens the stream keeps a last-known cache per side
//! and re-emits the concatenation whenever either side emits.

use crate::handle::QueryHandle;
use crate::subscription::{SubscriptionId, SubscriptionManager};
use crate::token::{apply_transform, resolve_slot, QueryToken, RowTransform, TokenSource};
use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use rill_core::{Result, Row};

/// A multicast stream of full result-set snapshots.
#[derive(Clone)]
pub struct Changes {
    state: Rc<ChangesState>,
}

struct ChangesState {
    token: QueryToken,
    subscribers: RefCell<SubscriptionManager>,
    latest: RefCell<Option<Vec<Row>>>,
    link: RefCell<Option<UpstreamLink>>,
}

/// The held upstream connection while subscribers are attached.
enum UpstreamLink {
    Handle {
        handle: Rc<dyn QueryHandle>,
        subscription: SubscriptionId,
    },
    Paired {
        left: Changes,
        left_subscription: SubscriptionId,
        right: Changes,
        right_subscription: SubscriptionId,
    },
}

impl Changes {
    pub(crate) fn new(token: QueryToken) -> Self {
        Self {
            state: Rc::new(ChangesState {
                token,
                subscribers: RefCell::new(SubscriptionManager::new()),
                latest: RefCell::new(None),
                link: RefCell::new(None),
            }),
        }
    }

    /// Subscribes to the stream.
    ///
    /// The first emission delivered to the callback is the current snapshot:
    /// live for the subscriber that connects the source, replayed for later
    /// ones. Fails with the producer's error if the source cannot be
    /// connected; no subscription is left behind in that case.
    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&[Row]) + 'static,
    {
        let id = self.state.subscribers.borrow_mut().subscribe(callback);

        if self.state.link.borrow().is_some() {
            let replay = self.state.latest.borrow().clone();
            if let Some(rows) = replay {
                self.state.subscribers.borrow().notify(id, &rows);
            }
            return Ok(id);
        }

        match connect(&self.state) {
            Ok(link) => {
                *self.state.link.borrow_mut() = Some(link);
                Ok(id)
            }
            Err(error) => {
                self.state.subscribers.borrow_mut().unsubscribe(id);
                Err(error)
            }
        }
    }

    /// Unsubscribes. When the last subscriber leaves, the upstream
    /// connection is torn down — recursively for paired streams, so parents
    /// release their own sources exactly when no other subscriber remains.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.state.subscribers.borrow_mut().unsubscribe(id);
        if removed && self.state.subscribers.borrow().is_empty() {
            if let Some(link) = self.state.link.borrow_mut().take() {
                disconnect(link);
            }
        }
        removed
    }

    /// Returns the latest emission, if any.
    pub fn current(&self) -> Option<Vec<Row>> {
        self.state.latest.borrow().clone()
    }

    /// Returns the number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.borrow().len()
    }

    /// Returns true while an upstream connection is held.
    pub fn is_connected(&self) -> bool {
        self.state.link.borrow().is_some()
    }
}

impl ChangesState {
    fn emit(&self, rows: Vec<Row>) {
        *self.latest.borrow_mut() = Some(rows.clone());
        self.subscribers.borrow().notify_all(&rows);
    }
}

impl Drop for ChangesState {
    fn drop(&mut self) {
        if let Some(link) = self.link.borrow_mut().take() {
            disconnect(link);
        }
    }
}

fn connect(state: &Rc<ChangesState>) -> Result<UpstreamLink> {
    match state.token.source() {
        TokenSource::Handle(slot) => {
            let handle = resolve_slot(slot)?;
            let weak = Rc::downgrade(state);
            let transform = state.token.transform();
            let subscription = handle.subscribe(Box::new(move |rows: &[Row]| {
                if let Some(state) = weak.upgrade() {
                    state.emit(apply_transform(&transform, rows.to_vec()));
                }
            }));
            Ok(UpstreamLink::Handle {
                handle,
                subscription,
            })
        }
        TokenSource::Paired(pair) => {
            let left = pair.left.changes();
            let right = pair.right.changes();
            let left_latest: Rc<RefCell<Option<Vec<Row>>>> = Rc::new(RefCell::new(None));
            let right_latest: Rc<RefCell<Option<Vec<Row>>>> = Rc::new(RefCell::new(None));

            // The left side connects first; ties between simultaneous
            // parent emissions therefore resolve left before right.
            let left_subscription = {
                let left_view = left_latest.clone();
                let right_view = right_latest.clone();
                let weak = Rc::downgrade(state);
                let transform = state.token.transform();
                left.subscribe(move |rows: &[Row]| {
                    *left_view.borrow_mut() = Some(rows.to_vec());
                    emit_pair(&weak, &left_view, &right_view, &transform);
                })?
            };

            let right_subscription = {
                let left_view = left_latest.clone();
                let right_view = right_latest.clone();
                let weak = Rc::downgrade(state);
                let transform = state.token.transform();
                let subscribed = right.subscribe(move |rows: &[Row]| {
                    *right_view.borrow_mut() = Some(rows.to_vec());
                    emit_pair(&weak, &left_view, &right_view, &transform);
                });
                match subscribed {
                    Ok(subscription) => subscription,
                    Err(error) => {
                        // Never leave a half-connected pair behind
                        left.unsubscribe(left_subscription);
                        return Err(error);
                    }
                }
            };

            Ok(UpstreamLink::Paired {
                left,
                left_subscription,
                right,
                right_subscription,
            })
        }
    }
}

/// Emits the concatenation of both sides once both have produced a value.
///
/// The side caches hold post-transform rows from the parent streams, so a
/// mapped parent's replacement values appear in every emission regardless
/// of which side triggered it.
fn emit_pair(
    state: &Weak<ChangesState>,
    left_latest: &Rc<RefCell<Option<Vec<Row>>>>,
    right_latest: &Rc<RefCell<Option<Vec<Row>>>>,
    transform: &Option<RowTransform>,
) {
    let left = left_latest.borrow().clone();
    let right = right_latest.borrow().clone();
    if let (Some(mut rows), Some(right_rows)) = (left, right) {
        rows.extend(right_rows);
        if let Some(state) = state.upgrade() {
            state.emit(apply_transform(transform, rows));
        }
    }
}

fn disconnect(link: UpstreamLink) {
    match link {
        UpstreamLink::Handle {
            handle,
            subscription,
        } => {
            handle.unsubscribe(subscription);
        }
        UpstreamLink::Paired {
            left,
            left_subscription,
            right,
            right_subscription,
        } => {
            left.unsubscribe(left_subscription);
            right.unsubscribe(right_subscription);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHandle;
    use alloc::vec;
    use rill_core::{Error, Value};

    fn make_row(id: u64, note: &str) -> Row {
        Row::new(id, vec![Value::Int64(id as i64), Value::String(note.into())])
    }

    fn make_rows(count: u64, prefix: &str) -> Vec<Row> {
        (0..count)
            .map(|i| make_row(i, &alloc::format!("{} {}", prefix, i)))
            .collect()
    }

    fn token_over(rows: Vec<Row>, description: &str) -> (QueryToken, Rc<MockHandle>) {
        let handle = MockHandle::new(rows, description);
        let producer_handle = handle.clone();
        let token = QueryToken::new(move || Ok(producer_handle as Rc<dyn QueryHandle>));
        (token, handle)
    }

    type Emissions = Rc<RefCell<Vec<Vec<Row>>>>;

    fn collect(changes: &Changes) -> (Emissions, SubscriptionId) {
        let emissions: Emissions = Rc::new(RefCell::new(Vec::new()));
        let sink = emissions.clone();
        let id = changes
            .subscribe(move |rows| sink.borrow_mut().push(rows.to_vec()))
            .unwrap();
        (emissions, id)
    }

    #[test]
    fn test_initial_emission_is_snapshot() {
        let rows = make_rows(25, "task");
        let (token, _handle) = token_over(rows.clone(), "tasks");

        let changes = token.changes();
        let (emissions, _id) = collect(&changes);

        assert_eq!(emissions.borrow().len(), 1);
        assert_eq!(emissions.borrow()[0], rows);
    }

    #[test]
    fn test_update_emits_refreshed_snapshot() {
        let (token, handle) = token_over(make_rows(3, "task"), "tasks");

        let changes = token.changes();
        let (emissions, _id) = collect(&changes);

        handle.update(0, 1, Value::String("updated".into()));

        let emissions = emissions.borrow();
        assert_eq!(emissions.len(), 2);
        assert_eq!(emissions[1][0].get(1), Some(&Value::String("updated".into())));
        // Other rows unchanged
        assert_eq!(emissions[1][1], emissions[0][1]);
        assert_eq!(emissions[1][2], emissions[0][2]);
    }

    #[test]
    fn test_multicast_and_replay_latest() {
        let (token, handle) = token_over(make_rows(2, "task"), "tasks");

        let changes = token.changes();
        let (first, _id1) = collect(&changes);

        handle.update(0, 1, Value::String("v2".into()));
        assert_eq!(first.borrow().len(), 2);

        // A late subscriber replays the latest emission, not the original
        let (second, _id2) = collect(&changes);
        assert_eq!(second.borrow().len(), 1);
        assert_eq!(
            second.borrow()[0][0].get(1),
            Some(&Value::String("v2".into()))
        );

        // Both observe further updates
        handle.update(1, 1, Value::String("v3".into()));
        assert_eq!(first.borrow().len(), 3);
        assert_eq!(second.borrow().len(), 2);
    }

    #[test]
    fn test_subscribing_twice_resolves_producer_once() {
        let calls = Rc::new(RefCell::new(0));
        let calls_clone = calls.clone();
        let handle = MockHandle::new(make_rows(1, "task"), "tasks");

        let token = QueryToken::new(move || {
            *calls_clone.borrow_mut() += 1;
            Ok(handle.clone() as Rc<dyn QueryHandle>)
        });

        let changes = token.changes();
        let (_e1, _id1) = collect(&changes);
        let (_e2, _id2) = collect(&changes);
        token.values().unwrap();

        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_teardown_releases_handle_subscription() {
        let (token, handle) = token_over(make_rows(1, "task"), "tasks");

        let changes = token.changes();
        let (_emissions, id) = collect(&changes);

        assert!(changes.is_connected());
        assert_eq!(handle.subscription_count(), 1);

        assert!(changes.unsubscribe(id));
        assert!(!changes.is_connected());
        assert_eq!(handle.subscription_count(), 0);
    }

    #[test]
    fn test_teardown_waits_for_last_subscriber() {
        let (token, handle) = token_over(make_rows(1, "task"), "tasks");

        let changes = token.changes();
        let (_e1, id1) = collect(&changes);
        let (_e2, id2) = collect(&changes);

        changes.unsubscribe(id1);
        assert!(changes.is_connected());
        assert_eq!(handle.subscription_count(), 1);

        changes.unsubscribe(id2);
        assert!(!changes.is_connected());
        assert_eq!(handle.subscription_count(), 0);
    }

    #[test]
    fn test_unsubscribe_nonexistent() {
        let (token, _handle) = token_over(make_rows(1, "task"), "tasks");
        let changes = token.changes();
        assert!(!changes.unsubscribe(999));
    }

    #[test]
    fn test_drop_disconnects() {
        let (token, handle) = token_over(make_rows(1, "task"), "tasks");

        {
            let changes = token.changes();
            let (_emissions, _id) = collect(&changes);
            assert_eq!(handle.subscription_count(), 1);
            // changes dropped with a live subscriber
        }

        assert_eq!(handle.subscription_count(), 0);
    }

    #[test]
    fn test_failing_producer_propagates_and_leaves_no_subscription() {
        let token = QueryToken::new(|| Err(Error::source_unavailable("no database")));
        let changes = token.changes();

        let result = changes.subscribe(|_| {});
        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
        assert_eq!(changes.subscriber_count(), 0);
        assert!(!changes.is_connected());
    }

    #[test]
    fn test_mapped_changes_replace_every_emission() {
        let (token, handle) = token_over(make_rows(25, "task"), "tasks");
        let mapped = token.map(|_| Row::new(0, vec![Value::Int64(2)]));

        let changes = mapped.changes();
        let (emissions, _id) = collect(&changes);

        handle.update(0, 1, Value::String("new note".into()));

        let emissions = emissions.borrow();
        assert_eq!(emissions.len(), 2);
        for emission in emissions.iter() {
            assert_eq!(emission.len(), 25);
            for row in emission {
                assert_eq!(row.get(0), Some(&Value::Int64(2)));
            }
        }
    }

    #[test]
    fn test_map_composition_over_changes() {
        let (token, handle) = token_over(vec![Row::new(1, vec![Value::Int64(10)])], "numbers");

        let composed = token
            .map(|mut row| {
                let next = row.get(0).and_then(|v| v.as_i64()).unwrap_or(0) + 1;
                row.set(0, Value::Int64(next));
                row
            })
            .map(|mut row| {
                let next = row.get(0).and_then(|v| v.as_i64()).unwrap_or(0) * 2;
                row.set(0, Value::Int64(next));
                row
            });

        let changes = composed.changes();
        let (emissions, _id) = collect(&changes);

        handle.update(1, 0, Value::Int64(20));

        let emissions = emissions.borrow();
        assert_eq!(emissions[0][0].get(0), Some(&Value::Int64(22)));
        assert_eq!(emissions[1][0].get(0), Some(&Value::Int64(42)));
    }

    #[test]
    fn test_combined_changes_emit_on_either_side() {
        let (left, left_handle) = token_over(make_rows(25, "left"), "left");
        let (right, right_handle) = token_over(make_rows(25, "right"), "right");

        let combined = left.combine(&right);
        let changes = combined.changes();
        let (emissions, _id) = collect(&changes);

        assert_eq!(emissions.borrow().len(), 1);
        assert_eq!(emissions.borrow()[0].len(), 50);

        left_handle.update(0, 1, Value::String("note 1".into()));
        {
            let emissions = emissions.borrow();
            assert_eq!(emissions.len(), 2);
            assert_eq!(
                emissions[1][0].get(1),
                Some(&Value::String("note 1".into()))
            );
            // The right slice is the last-known value, not a re-fetch
            assert_eq!(&emissions[1][25..], &emissions[0][25..]);
        }

        right_handle.update(0, 1, Value::String("note 2".into()));
        {
            let emissions = emissions.borrow();
            assert_eq!(emissions.len(), 3);
            assert_eq!(
                emissions[2][25].get(1),
                Some(&Value::String("note 2".into()))
            );
            // The left slice still carries its own update
            assert_eq!(
                emissions[2][0].get(1),
                Some(&Value::String("note 1".into()))
            );
        }
    }

    #[test]
    fn test_concat_changes_match_combine_semantics() {
        let (left, left_handle) = token_over(make_rows(25, "left"), "left");
        let (right, _rh) = token_over(make_rows(25, "right"), "right");

        let concatenated = left.concat(&right);
        let changes = concatenated.changes();
        let (emissions, _id) = collect(&changes);

        left_handle.update(0, 1, Value::String("note 1".into()));

        let emissions = emissions.borrow();
        assert_eq!(emissions.len(), 2);
        assert_eq!(emissions[1].len(), 50);
        assert_eq!(
            emissions[1][0].get(1),
            Some(&Value::String("note 1".into()))
        );
    }

    #[test]
    fn test_combine_replacement_persists_on_other_side_update() {
        let (left, _lh) = token_over(make_rows(25, "left"), "left");
        let (right, right_handle) = token_over(make_rows(25, "right"), "right");

        let constant = left.map(|_| Row::new(0, vec![Value::Int64(4)]));
        let combined = constant.combine(&right);

        let changes = combined.changes();
        let (emissions, _id) = collect(&changes);

        // Update triggered solely by the right side
        right_handle.update(0, 1, Value::String("new note".into()));

        let emissions = emissions.borrow();
        let last = emissions.last().unwrap();
        assert_eq!(last.len(), 50);
        for row in &last[..25] {
            assert_eq!(row.get(0), Some(&Value::Int64(4)));
        }
        assert_eq!(last[25].get(1), Some(&Value::String("new note".into())));
    }

    #[test]
    fn test_combine_with_mapped_self() {
        let (token, handle) = token_over(make_rows(25, "task"), "tasks");
        let mapped = token.map(|_| Row::new(0, vec![Value::Int64(3)]));

        let combined = mapped.combine(&token);
        let changes = combined.changes();
        let (emissions, _id) = collect(&changes);

        {
            let emissions = emissions.borrow();
            let first = &emissions[0];
            assert_eq!(first.len(), 50);
            for row in &first[..25] {
                assert_eq!(row.get(0), Some(&Value::Int64(3)));
            }
        }

        handle.update(0, 1, Value::String("new note".into()));

        let emissions = emissions.borrow();
        // Both sides observe the same underlying handle, so the mutation
        // produces one emission per side, left first
        assert_eq!(emissions.len(), 3);
        let last = emissions.last().unwrap();
        for row in &last[..25] {
            assert_eq!(row.get(0), Some(&Value::Int64(3)));
        }
        assert_eq!(last[25].get(1), Some(&Value::String("new note".into())));
    }

    // ==================== 补充测试 ====================

    #[test]
    fn test_pair_teardown_cascades_to_both_parents() {
        let (left, left_handle) = token_over(make_rows(1, "l"), "left");
        let (right, right_handle) = token_over(make_rows(1, "r"), "right");

        let changes = left.combine(&right).changes();
        let (_emissions, id) = collect(&changes);

        assert_eq!(left_handle.subscription_count(), 1);
        assert_eq!(right_handle.subscription_count(), 1);

        changes.unsubscribe(id);

        assert_eq!(left_handle.subscription_count(), 0);
        assert_eq!(right_handle.subscription_count(), 0);
    }

    #[test]
    fn test_pair_with_failing_side_unwinds() {
        let (left, left_handle) = token_over(make_rows(1, "l"), "left");
        let right = QueryToken::new(|| Err(Error::source_unavailable("gone")));

        let changes = left.combine(&right).changes();
        let result = changes.subscribe(|_| {});

        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
        // The half-connected left side was released
        assert_eq!(left_handle.subscription_count(), 0);
        assert!(!changes.is_connected());
    }

    #[test]
    fn test_nested_composition_changes_flat_order() {
        let (a, _ha) = token_over(make_rows(2, "a"), "a");
        let (b, hb) = token_over(make_rows(2, "b"), "b");
        let (c, _hc) = token_over(make_rows(2, "c"), "c");

        let changes = a.combine(&b).concat(&c).changes();
        let (emissions, _id) = collect(&changes);

        hb.update(0, 1, Value::String("b updated".into()));

        let emissions = emissions.borrow();
        let last = emissions.last().unwrap();
        assert_eq!(last.len(), 6);
        assert_eq!(last[0].get(1), Some(&Value::String("a 0".into())));
        assert_eq!(last[2].get(1), Some(&Value::String("b updated".into())));
        assert_eq!(last[4].get(1), Some(&Value::String("c 0".into())));
    }

    #[test]
    fn test_current_reflects_latest() {
        let (token, handle) = token_over(make_rows(1, "task"), "tasks");

        let changes = token.changes();
        assert!(changes.current().is_none());

        let (_emissions, _id) = collect(&changes);
        assert_eq!(changes.current().unwrap()[0].get(1), Some(&Value::String("task 0".into())));

        handle.update(0, 1, Value::String("later".into()));
        assert_eq!(
            changes.current().unwrap()[0].get(1),
            Some(&Value::String("later".into()))
        );
    }
}
