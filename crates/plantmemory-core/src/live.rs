//! Live (reactive) queries over the entry store.
//!
//! A [`LiveQuery`] re-delivers the full result of its query every time the
//! store commits a mutation. It waits on the store's change version through a
//! `tokio::sync::watch` receiver, which only ever holds the latest version:
//! writes that land while a subscriber is busy coalesce into a single
//! emission of the newest state, and a slow subscriber never holds up the
//! writer or any other subscriber.
//!
//! Dropping the handle is the cancellation; nothing else holds a reference
//! to it, so there is nothing to unregister.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{CoreError, Result, StorageError};
use crate::storage::EntryStore;

type Query<T> = dyn Fn(&EntryStore) -> Result<T> + Send + Sync;

/// Run a store call on the blocking pool.
///
/// The closure runs to completion even if the awaiting future is dropped,
/// so a write started here is never lost to a torn-down caller.
pub async fn blocking<T, F>(store: &Arc<EntryStore>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&EntryStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store)).await?
}

/// A subscription that yields full snapshots of one query.
pub struct LiveQuery<T> {
    store: Arc<EntryStore>,
    changes: watch::Receiver<u64>,
    query: Arc<Query<T>>,
    primed: bool,
    // Set while a query runs; survives a dropped `next()` future.
    pending: bool,
}

impl<T: Send + 'static> LiveQuery<T> {
    pub(crate) fn new<F>(store: Arc<EntryStore>, query: F) -> Self
    where
        F: Fn(&EntryStore) -> Result<T> + Send + Sync + 'static,
    {
        let changes = store.subscribe_changes();
        tracing::debug!(version = *changes.borrow(), "live query subscribed");
        Self {
            store,
            changes,
            query: Arc::new(query),
            primed: false,
            pending: false,
        }
    }

    /// Next emission.
    ///
    /// The first call returns the current result at once. Later calls wait
    /// for the next committed mutation and return the result as of then.
    ///
    /// Cancel-safe: dropping the future loses no change notification.
    pub async fn next(&mut self) -> Result<T> {
        if self.primed && !self.pending {
            self.changes
                .changed()
                .await
                .map_err(|_| CoreError::Storage(StorageError::TaskAborted("store closed".into())))?;
        }
        let version = *self.changes.borrow_and_update();
        self.primed = true;
        self.pending = true;
        let query = Arc::clone(&self.query);
        let result = blocking(&self.store, move |store| query(store)).await;
        self.pending = false;
        tracing::debug!(version, ok = result.is_ok(), "live query emitted");
        result
    }

    /// Whether a mutation has committed since the last emission.
    pub fn has_changed(&self) -> bool {
        !self.primed || self.pending || self.changes.has_changed().unwrap_or(false)
    }

    /// Transform every emission.
    pub fn map<U, G>(self, f: G) -> LiveQuery<U>
    where
        U: Send + 'static,
        G: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = self.query;
        LiveQuery {
            store: self.store,
            changes: self.changes,
            query: Arc::new(move |store: &EntryStore| inner(store).map(&f)),
            primed: self.primed,
            pending: self.pending,
        }
    }

    /// Stop receiving emissions. Equivalent to dropping the handle.
    pub fn cancel(self) {
        tracing::debug!("live query cancelled");
    }
}

impl<T> fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveQuery")
            .field("version", &*self.changes.borrow())
            .field("primed", &self.primed)
            .field("pending", &self.pending)
            .finish()
    }
}
