//! Set-once holder for the process-wide task store.

use std::sync::{Arc, OnceLock};

use super::TaskStore;
use crate::{Error, Result};

/// Shared slot that receives the task store once startup has opened it.
///
/// Components created before the database is ready hold a clone of the slot
/// and get [`Error::NotInitialized`] until [`StoreSlot::init`] runs.
#[derive(Clone, Default)]
pub struct StoreSlot {
    inner: Arc<OnceLock<TaskStore>>,
}

impl StoreSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the store. A second call is rejected and leaves the first store in place.
    pub fn init(&self, store: TaskStore) -> Result<()> {
        self.inner
            .set(store)
            .map_err(|_| Error::InvalidInput("task store is already initialized".into()))
    }

    /// The installed store, or [`Error::NotInitialized`].
    pub fn get(&self) -> Result<TaskStore> {
        self.inner.get().cloned().ok_or(Error::NotInitialized)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.get().is_some()
    }
}
