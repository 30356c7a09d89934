//! In-memory query handle used as a stand-in for the external engine in
//! tests.

use crate::handle::QueryHandle;
use crate::subscription::{RowsCallback, SubscriptionId, SubscriptionManager};
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use rill_core::{Row, RowId, Value};

pub(crate) struct MockHandle {
    rows: RefCell<Vec<Row>>,
    subscriptions: RefCell<SubscriptionManager>,
    description: String,
}

impl MockHandle {
    pub(crate) fn new(rows: Vec<Row>, description: &str) -> Rc<Self> {
        Rc::new(Self {
            rows: RefCell::new(rows),
            subscriptions: RefCell::new(SubscriptionManager::new()),
            description: description.to_string(),
        })
    }

    /// Mutates one row cell and pushes a refreshed snapshot to subscribers.
    pub(crate) fn update(&self, id: RowId, index: usize, value: Value) {
        let snapshot = {
            let mut rows = self.rows.borrow_mut();
            if let Some(row) = rows.iter_mut().find(|r| r.id() == id) {
                row.set(index, value);
            }
            rows.clone()
        };
        self.subscriptions.borrow().notify_all(&snapshot);
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }
}

impl QueryHandle for MockHandle {
    fn snapshot(&self) -> Vec<Row> {
        self.rows.borrow().clone()
    }

    fn subscribe(&self, callback: RowsCallback) -> SubscriptionId {
        let id = self.subscriptions.borrow_mut().subscribe_boxed(callback);
        let snapshot = self.rows.borrow().clone();
        self.subscriptions.borrow().notify(id, &snapshot);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow_mut().unsubscribe(id)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
