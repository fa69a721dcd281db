//! Redirect Interceptor
//!
//! Owns the in-memory rule cache and answers the browser's blocking
//! navigation callback. Decisions only ever look at the cache; refreshing
//! it is the caller's job (see [`crate::background`]).

use crate::matcher::find_matching_rule;
use crate::rule::Rule;
use crate::store::StoreSnapshot;
use crate::types::{Decision, NavigationRequest};
use crate::url::is_http_url;

/// Lifecycle of the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterceptorState {
    /// No rules loaded yet; everything passes through
    #[default]
    Uninitialized,
    /// Rules are applied
    Active,
    /// Extension switched off; everything passes through
    Disabled,
}

/// Result of loading a snapshot into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    pub rule_count: usize,
    pub state: InterceptorState,
    /// Nothing configured yet and no legacy marker
    pub needs_onboarding: bool,
}

/// Cached rules plus the navigation decision logic.
#[derive(Debug, Clone, Default)]
pub struct RedirectInterceptor {
    state: InterceptorState,
    enabled: bool,
    rules: Vec<Rule>,
}

impl RedirectInterceptor {
    pub fn new() -> Self {
        Self {
            state: InterceptorState::Uninitialized,
            enabled: true,
            rules: Vec::new(),
        }
    }

    pub fn state(&self) -> InterceptorState {
        self.state
    }

    /// Cached rule list, in store order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replace the cache with `snapshot`.
    pub fn load(&mut self, snapshot: StoreSnapshot) -> LoadOutcome {
        let needs_onboarding = snapshot.needs_onboarding();
        self.rules = snapshot.rules;
        self.enabled = snapshot.enabled;
        self.state = state_for(self.enabled);
        log::debug!(
            "Rule cache replaced: {} rule(s), state {:?}",
            self.rules.len(),
            self.state
        );
        LoadOutcome {
            rule_count: self.rules.len(),
            state: self.state,
            needs_onboarding,
        }
    }

    /// Switch between `Active` and `Disabled` without reloading rules.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if self.state != InterceptorState::Uninitialized {
            self.state = state_for(enabled);
        }
        log::info!("Extension state changed to: {}", enabled);
    }

    /// Decide what to do with a navigation.
    ///
    /// Only top-level `http(s)` documents are considered, and only while
    /// `Active`. Anything else loads normally.
    pub fn evaluate(&self, request: &NavigationRequest<'_>) -> Decision {
        if self.state != InterceptorState::Active {
            return Decision::Allow;
        }
        if !request.request_type.is_top_level() || !is_http_url(request.url) {
            return Decision::Allow;
        }

        match find_matching_rule(request.url, &self.rules) {
            Some(rule) => {
                log::info!("Redirecting {} to {}", request.url, rule.destination);
                Decision::Redirect {
                    url: rule.destination.clone(),
                    rule_id: rule.id.clone(),
                }
            }
            None => Decision::Allow,
        }
    }
}

fn state_for(enabled: bool) -> InterceptorState {
    if enabled {
        InterceptorState::Active
    } else {
        InterceptorState::Disabled
    }
}
