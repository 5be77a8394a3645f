//! Preview handle store
//!
//! Every accepted upload gets one preview entry, addressable at
//! `/preview/{upload_id}`. The entry lives exactly as long as its
//! [`PreviewHandle`]: dropping the handle (upload replaced, orchestrator torn
//! down) removes the entry synchronously, so repeated selections in one
//! session never accumulate previews.

use axum::body::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub mime_type: String,
    pub bytes: Bytes,
}

type Entries = Mutex<HashMap<Uuid, PreviewEntry>>;

fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<Uuid, PreviewEntry>> {
    // A panic while holding the lock cannot leave the map half-updated
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared registry of live previews
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Entries>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preview and return the handle that owns it
    pub fn acquire(&self, id: Uuid, mime_type: String, bytes: Bytes) -> PreviewHandle {
        lock(&self.entries).insert(id, PreviewEntry { mime_type, bytes });
        debug!(upload_id = %id, "Preview acquired");

        PreviewHandle {
            id,
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Look up a live preview
    pub fn get(&self, id: Uuid) -> Option<PreviewEntry> {
        lock(&self.entries).get(&id).cloned()
    }

    /// Number of previews currently held
    pub fn active_count(&self) -> usize {
        lock(&self.entries).len()
    }
}

/// Owning handle for one preview entry
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    entries: Weak<Entries>,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> String {
        format!("/preview/{}", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Some(entries) = self.entries.upgrade() {
            lock(&entries).remove(&self.id);
            debug!(upload_id = %self.id, "Preview released");
        }
    }
}
