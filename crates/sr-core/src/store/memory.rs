//! In-process store shared between contexts.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, RwLock};

use super::{ChangeFeed, RuleStore, StoreChange, StoreSnapshot};
use crate::error::StorageError;
use crate::rule::Rule;

/// Shared in-memory store.
///
/// Clones are handles onto the same data, so a background service, an
/// editor and a status panel built from clones of one `MemoryStore` see
/// each other's writes and change notifications.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreSnapshot>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    /// Empty store, as on first install.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `snapshot`.
    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Arc::new(RwLock::new(snapshot)),
            feed: ChangeFeed::default(),
        }
    }

    /// Set the legacy `defaultRedirectUrl` marker.
    pub fn set_default_redirect_url(&self, url: Option<String>) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| StorageError::Poisoned)?;
        state.default_redirect_url = url;
        Ok(())
    }

    /// Overwrite everything with `snapshot`, as when mirroring a fresh read
    /// of the browser's storage.
    pub fn replace(&self, snapshot: StoreSnapshot) -> Result<(), StorageError> {
        let enabled = snapshot.enabled;
        {
            let mut state = self.state.write().map_err(|_| StorageError::Poisoned)?;
            *state = snapshot;
        }
        self.feed.publish(StoreChange {
            rules_changed: true,
            enabled: Some(enabled),
        });
        Ok(())
    }
}

impl RuleStore for MemoryStore {
    fn load(&self) -> Result<StoreSnapshot, StorageError> {
        let state = self.state.read().map_err(|_| StorageError::Poisoned)?;
        Ok(state.clone())
    }

    fn save(&self, rules: &[Rule]) -> Result<(), StorageError> {
        {
            let mut state = self.state.write().map_err(|_| StorageError::Poisoned)?;
            state.rules = rules.to_vec();
        }
        self.feed.publish(StoreChange::rules());
        Ok(())
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        {
            let mut state = self.state.write().map_err(|_| StorageError::Poisoned)?;
            state.enabled = enabled;
        }
        self.feed.publish(StoreChange::enabled(enabled));
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StoreChange> {
        self.feed.subscribe()
    }
}
