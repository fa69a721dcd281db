//! Rule Store access layer
//!
//! The store is the single source of truth shared by the background,
//! options and popup contexts. It holds the ordered rule list, the global
//! enabled flag and the legacy `defaultRedirectUrl` marker, under the same
//! keys the browser's key-value storage uses.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StorageError;
use crate::rule::Rule;

#[cfg(feature = "fs")]
mod file;
mod memory;

#[cfg(feature = "fs")]
pub use file::FileStore;
pub use memory::MemoryStore;

/// Storage key of the rule list.
pub const KEY_RULES: &str = "redirectRules";
/// Storage key of the global enabled flag.
pub const KEY_ENABLED: &str = "extensionEnabled";
/// Storage key of the legacy default redirect marker.
pub const KEY_DEFAULT_REDIRECT_URL: &str = "defaultRedirectUrl";

// =============================================================================
// Snapshot
// =============================================================================

/// Everything the store holds, as read in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(rename = "redirectRules", default, deserialize_with = "rules_or_empty")]
    pub rules: Vec<Rule>,
    /// Absent or `null` means enabled
    #[serde(rename = "extensionEnabled", default = "default_enabled", deserialize_with = "enabled_unless_false")]
    pub enabled: bool,
    #[serde(rename = "defaultRedirectUrl", default, skip_serializing_if = "Option::is_none")]
    pub default_redirect_url: Option<String>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            enabled: true,
            default_redirect_url: None,
        }
    }
}

impl StoreSnapshot {
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// A fresh install: nothing configured and no legacy marker either.
    pub fn needs_onboarding(&self) -> bool {
        self.rules.is_empty()
            && self
                .default_redirect_url
                .as_deref()
                .map_or(true, str::is_empty)
    }
}

fn default_enabled() -> bool {
    true
}

fn rules_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Rule>, D::Error> {
    Ok(Option::<Vec<Rule>>::deserialize(deserializer)?.unwrap_or_default())
}

fn enabled_unless_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)? != Some(false))
}

// =============================================================================
// Change Notifications
// =============================================================================

/// What changed in a single store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreChange {
    /// The rule list was replaced
    pub rules_changed: bool,
    /// New value of the global enabled flag, if it was written
    pub enabled: Option<bool>,
}

impl StoreChange {
    pub fn rules() -> Self {
        Self {
            rules_changed: true,
            enabled: None,
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            rules_changed: false,
            enabled: Some(enabled),
        }
    }

    /// Build from a browser `storage.onChanged` payload
    /// (`{ key: { oldValue, newValue } }`).
    pub fn from_browser_changes(changes: &serde_json::Value) -> Self {
        let rules_changed = changes.get(KEY_RULES).is_some();
        let enabled = changes
            .get(KEY_ENABLED)
            .map(|change| change.get("newValue").and_then(serde_json::Value::as_bool) != Some(false));
        Self {
            rules_changed,
            enabled,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.rules_changed && self.enabled.is_none()
    }
}

/// Fan-out of store changes to every live subscriber.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChangeFeed {
    subscribers: Arc<Mutex<Vec<Sender<StoreChange>>>>,
}

impl ChangeFeed {
    pub(crate) fn subscribe(&self) -> Receiver<StoreChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver `change`, dropping subscribers whose receiver is gone.
    pub(crate) fn publish(&self, change: StoreChange) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(change).is_ok());
        log::trace!("Store change {:?} delivered to {} subscriber(s)", change, subscribers.len());
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// Access to the persisted rule store.
///
/// Implementations give last-writer-wins semantics: a `save` replaces the
/// whole rule list and readers never observe a partial list.
pub trait RuleStore {
    /// Read rules, the enabled flag and the legacy marker.
    fn load(&self) -> Result<StoreSnapshot, StorageError>;

    /// Replace the entire rule list.
    fn save(&self, rules: &[Rule]) -> Result<(), StorageError>;

    /// Persist the global enabled flag.
    fn set_enabled(&self, enabled: bool) -> Result<(), StorageError>;

    /// Receive a [`StoreChange`] for every subsequent write.
    fn subscribe(&self) -> Receiver<StoreChange>;
}

impl<T: RuleStore + ?Sized> RuleStore for &T {
    fn load(&self) -> Result<StoreSnapshot, StorageError> {
        (**self).load()
    }

    fn save(&self, rules: &[Rule]) -> Result<(), StorageError> {
        (**self).save(rules)
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        (**self).set_enabled(enabled)
    }

    fn subscribe(&self) -> Receiver<StoreChange> {
        (**self).subscribe()
    }
}
