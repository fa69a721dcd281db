//! Background service
//!
//! Wires a [`RedirectInterceptor`] to a store handle and to the two ways a
//! cache refresh can be triggered: explicit `updateRules` messages and the
//! store's own change feed.

use std::sync::mpsc::{self, Receiver};

use crate::interceptor::{InterceptorState, LoadOutcome, RedirectInterceptor};
use crate::message::{Message, Messenger, Response};
use crate::store::{RuleStore, StoreChange, StoreSnapshot};
use crate::types::{Decision, NavigationRequest};

/// Long-lived background context.
pub struct Background<S: RuleStore> {
    store: S,
    interceptor: RedirectInterceptor,
    inbox: Receiver<Message>,
    messenger: Messenger,
    changes: Receiver<StoreChange>,
}

impl<S: RuleStore> Background<S> {
    /// Subscribe to `store` and open a message inbox. Rules are not loaded
    /// until [`start`](Self::start).
    pub fn new(store: S) -> Self {
        let (tx, inbox) = mpsc::channel();
        let changes = store.subscribe();
        Self {
            store,
            interceptor: RedirectInterceptor::new(),
            inbox,
            messenger: Messenger::new(tx),
            changes,
        }
    }

    /// Load rules and activate.
    ///
    /// Returns `true` when the setup page should be opened: the store has
    /// no rules and no legacy default redirect. A failed load still
    /// activates with an empty cache so navigation is never blocked.
    pub fn start(&mut self) -> bool {
        log::info!("Initializing background...");
        let outcome = match self.store.load() {
            Ok(snapshot) => self.interceptor.load(snapshot),
            Err(e) => {
                log::error!("Error loading rules: {}", e);
                let outcome = self.interceptor.load(StoreSnapshot::default());
                LoadOutcome {
                    needs_onboarding: false,
                    ..outcome
                }
            }
        };
        if outcome.needs_onboarding {
            log::info!("First time setup detected");
        }
        log::info!("Rules loaded: {} rule(s), {:?}", outcome.rule_count, outcome.state);
        outcome.needs_onboarding
    }

    /// Re-read rules and the enabled flag, replacing the cache.
    /// On failure the previous cache stays in place.
    pub fn refresh(&mut self) {
        log::debug!("Updating rules...");
        match self.store.load() {
            Ok(snapshot) => {
                let outcome = self.interceptor.load(snapshot);
                log::debug!("Rules updated successfully ({} rule(s))", outcome.rule_count);
            }
            Err(e) => log::error!("Error updating rules: {}", e),
        }
    }

    /// Answer a message from another context.
    pub fn handle_message(&mut self, message: Message) -> Option<Response> {
        match message {
            Message::UpdateRules => {
                self.refresh();
                Some(Response::success())
            }
            Message::GetRules => Some(Response::Rules {
                rules: self.interceptor.rules().to_vec(),
            }),
            Message::Unknown(action) => {
                log::warn!("Unknown message action: {}", action);
                None
            }
        }
    }

    /// React to a store write made by any context.
    pub fn on_storage_change(&mut self, change: StoreChange) {
        if change.rules_changed {
            log::debug!("Storage changed, updating rules...");
            self.refresh();
        } else if let Some(enabled) = change.enabled {
            self.interceptor.set_enabled(enabled);
        }
    }

    /// Process every queued message and store change. Returns the number
    /// of events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.inbox.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        while let Ok(change) = self.changes.try_recv() {
            self.on_storage_change(change);
            handled += 1;
        }
        handled
    }

    /// Handle for other contexts to send messages to this background.
    pub fn messenger(&self) -> Messenger {
        self.messenger.clone()
    }

    /// Synchronous navigation decision against the current cache.
    pub fn evaluate(&self, request: &NavigationRequest<'_>) -> Decision {
        self.interceptor.evaluate(request)
    }

    pub fn state(&self) -> InterceptorState {
        self.interceptor.state()
    }

    pub fn interceptor(&self) -> &RedirectInterceptor {
        &self.interceptor
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
