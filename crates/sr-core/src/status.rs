//! Status Panel
//!
//! The popup: a summary of the current state plus two shortcuts, the
//! global on/off switch and "redirect this site".

use serde::Serialize;

use crate::draft::{find_duplicate, validate_destination, MIN_SOURCE_LEN};
use crate::error::{EditorError, ParseError, Result, ValidationError};
use crate::matcher::{active_rule_count, find_matching_rule};
use crate::message::{Message, Notifier};
use crate::rule::{MatchType, Rule};
use crate::store::{RuleStore, StoreSnapshot};
use crate::url::request_hostname;

/// What the popup shows about the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SiteStatus {
    /// No page URL available
    Unknown,
    /// The page URL has no hostname
    InvalidUrl,
    /// An enabled rule matches this page
    Redirects { host: String, destination: String },
    NoRule { host: String },
}

/// Popup summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub active_rules: usize,
    pub enabled: bool,
    pub site: SiteStatus,
}

/// Compute the summary from a rule list.
pub fn summarize(rules: &[Rule], enabled: bool, current_url: Option<&str>) -> StatusSummary {
    let site = match current_url.filter(|url| !url.is_empty()) {
        None => SiteStatus::Unknown,
        Some(url) => match request_hostname(url) {
            None => SiteStatus::InvalidUrl,
            Some(host) => match find_matching_rule(url, rules) {
                Some(rule) => SiteStatus::Redirects {
                    host,
                    destination: rule.destination.clone(),
                },
                None => SiteStatus::NoRule { host },
            },
        },
    };
    StatusSummary {
        active_rules: active_rule_count(rules),
        enabled,
        site,
    }
}

/// Popup state over the shared store.
pub struct StatusPanel<S: RuleStore, N: Notifier> {
    store: S,
    notifier: N,
    rules: Vec<Rule>,
    enabled: bool,
    current_url: Option<String>,
    /// False until a load has succeeded; writes are refused before that
    loaded: bool,
}

impl<S: RuleStore, N: Notifier> StatusPanel<S, N> {
    /// Load the store for the page at `current_url`. A failed load is
    /// logged and the panel shows an empty, enabled state, but nothing is
    /// written until the store has been read successfully.
    pub fn open(store: S, notifier: N, current_url: Option<String>) -> Self {
        let (snapshot, loaded) = match store.load() {
            Ok(snapshot) => (snapshot, true),
            Err(e) => {
                log::error!("Error loading popup data: {}", e);
                (StoreSnapshot::default(), false)
            }
        };
        Self {
            store,
            notifier,
            rules: snapshot.rules,
            enabled: snapshot.enabled,
            current_url,
            loaded,
        }
    }

    /// Retry a load that failed at open time.
    fn ensure_loaded(&mut self) -> Result<()> {
        if !self.loaded {
            let snapshot = self.store.load().map_err(|e| {
                log::error!("Popup data still unavailable: {}", e);
                e
            })?;
            self.rules = snapshot.rules;
            self.enabled = snapshot.enabled;
            self.loaded = true;
        }
        Ok(())
    }

    pub fn summary(&self) -> StatusSummary {
        summarize(&self.rules, self.enabled, self.current_url.as_deref())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip and persist the global flag. Returns the new value.
    ///
    /// The background picks it up from the store change feed.
    pub fn toggle_extension(&mut self) -> Result<bool> {
        self.ensure_loaded()?;
        let enabled = !self.enabled;
        if let Err(e) = self.store.set_enabled(enabled) {
            log::error!("Error toggling extension: {}", e);
            return Err(e.into());
        }
        self.enabled = enabled;
        log::info!("Extension {}", if enabled { "enabled" } else { "disabled" });
        Ok(enabled)
    }

    /// Create an exact-match rule for the current page's hostname.
    pub fn quick_add(&mut self, destination: &str) -> Result<Rule> {
        let url = self.current_url.as_deref().ok_or(EditorError::NoCurrentSite)?;
        let host = request_hostname(url).ok_or_else(|| ParseError::InvalidUrl(url.to_string()))?;
        self.ensure_loaded()?;

        if host.chars().count() < MIN_SOURCE_LEN {
            return Err(ValidationError::SourceTooShort.into());
        }
        validate_destination(destination)?;
        if find_duplicate(&self.rules, &host, MatchType::Exact).is_some() {
            return Err(ValidationError::DuplicateRule.into());
        }

        let rule = Rule::new(host, destination.trim(), MatchType::Exact);
        let mut rules = self.rules.clone();
        rules.push(rule.clone());
        if let Err(e) = self.store.save(&rules) {
            log::error!("Error adding quick rule: {}", e);
            return Err(e.into());
        }
        self.rules = rules;
        log::info!("Quick rule added: {} -> {}", rule.source, rule.destination);

        self.notifier.notify(Message::UpdateRules)?;
        Ok(rule)
    }
}
