//! In-memory, observable collection of records ordered by rank.
//!
//! The store never talks to the network. Callers confirm a change with the
//! gateway first and only then apply it here, so the store reflects server
//! state apart from the round trip in flight.
//!
//! Every mutation goes through a `watch` channel. Renderers hold a receiver and
//! redraw on `changed()`; readers that only need the current list call
//! [`Store::snapshot`].

use std::cmp::Reverse;

use tokio::sync::watch;
use tracing::debug;

use crate::resource::Resource;

pub struct Store<R> {
    records: watch::Sender<Vec<R>>,
}

impl<R: Resource> Default for Store<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> Store<R> {
    pub fn new() -> Self {
        Self {
            records: watch::Sender::new(Vec::new()),
        }
    }

    /// Replaces the whole collection, keeping at most one record per id.
    pub fn initialize(&self, records: Vec<R>) {
        let mut unique: Vec<R> = Vec::with_capacity(records.len());
        for record in records {
            match unique.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record,
                None => unique.push(record),
            }
        }
        debug!(count = unique.len(), collection = R::COLLECTION, "store initialized");
        self.records.send_modify(|records| {
            *records = unique;
            sort_by_rank(records);
        });
    }

    /// Adds a record returned by a confirmed create. An id already present is
    /// replaced in place instead of duplicated.
    pub fn append(&self, record: R) {
        self.records.send_modify(|records| {
            match records.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
            sort_by_rank(records);
        });
    }

    /// Bumps the rank of `id` by one. Unknown ids are ignored: the record may
    /// already have been removed by the time the caller gets here.
    pub fn increment_rank(&self, id: &str) {
        self.records.send_if_modified(|records| {
            let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
                debug!(id, "increment on missing record ignored");
                return false;
            };
            record.set_rank(record.rank().saturating_add(1));
            sort_by_rank(records);
            true
        });
    }

    /// Merges the authoritative copy of an existing record.
    pub fn replace(&self, record: R) {
        self.records.send_if_modified(|records| {
            let Some(existing) = records.iter_mut().find(|r| r.id() == record.id()) else {
                debug!(id = record.id(), "replace on missing record ignored");
                return false;
            };
            *existing = record;
            sort_by_rank(records);
            true
        });
    }

    pub fn remove(&self, id: &str) {
        self.records.send_if_modified(|records| {
            let before = records.len();
            records.retain(|r| r.id() != id);
            records.len() != before
        });
    }

    pub fn get(&self, id: &str) -> Option<R> {
        self.records.borrow().iter().find(|r| r.id() == id).cloned()
    }

    pub fn snapshot(&self) -> Vec<R> {
        self.records.borrow().clone()
    }

    /// Records whose searchable text contains `needle`, ignoring case. An empty
    /// needle matches everything.
    pub fn filtered(&self, needle: &str) -> Vec<R> {
        let needle = needle.trim().to_lowercase();
        self.records
            .borrow()
            .iter()
            .filter(|r| needle.is_empty() || r.search_text().to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<R>> {
        self.records.subscribe()
    }
}

// `sort_by_key` is stable, so equal ranks keep their insertion order.
fn sort_by_rank<R: Resource>(records: &mut [R]) {
    records.sort_by_key(|r| Reverse(r.rank()));
}
