//! Rule Editor
//!
//! The options page's view of the store. Every operation validates first,
//! computes the new rule list on a copy, persists it, and only then
//! updates the in-memory list and tells the background to reload. A failed
//! save leaves the editor exactly as it was.

use std::fmt;

use crate::draft::{build_rule, RuleDraft};
use crate::error::{EditorError, Result};
use crate::exchange::{apply_import, parse_import, ExportDocument, ImportPolicy, ImportedRule};
use crate::message::{Message, Notifier};
use crate::rule::Rule;
use crate::store::RuleStore;

// =============================================================================
// Confirmation
// =============================================================================

/// Questions the editor needs a yes/no answer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question<'a> {
    DeleteRule { source: &'a str },
    ClearAll { count: usize },
    /// Yes replaces the current rules, no merges
    ImportReplace { count: usize },
}

impl fmt::Display for Question<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteRule { source } => {
                write!(f, "Are you sure you want to delete the redirect rule for \"{}\"?", source)
            }
            Self::ClearAll { count } => write!(
                f,
                "Are you sure you want to delete ALL {} redirect rules?\n\n\
                 This action cannot be undone. Consider exporting your rules first as a backup.",
                count
            ),
            Self::ImportReplace { count } => write!(
                f,
                "This will import {} rules. Do you want to replace your current rules or merge them?\n\n\
                 Answer yes to REPLACE all current rules, or no to MERGE with existing rules.",
                count
            ),
        }
    }
}

/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, question: &Question<'_>) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&Question<'_>) -> bool,
{
    fn confirm(&mut self, question: &Question<'_>) -> bool {
        self(question)
    }
}

// =============================================================================
// Editor
// =============================================================================

/// CRUD surface over the rule store.
pub struct RuleEditor<S: RuleStore, N: Notifier> {
    store: S,
    notifier: N,
    rules: Vec<Rule>,
    first_time: bool,
    pending_edit: Option<Rule>,
}

impl<S: RuleStore, N: Notifier> RuleEditor<S, N> {
    /// Load the current rules.
    pub fn open(store: S, notifier: N) -> Result<Self> {
        let rules = store.load()?.rules;
        log::debug!("Loaded {} existing rule(s)", rules.len());
        Ok(Self {
            first_time: rules.is_empty(),
            store,
            notifier,
            rules,
            pending_edit: None,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Whether the first-time setup message should be shown.
    pub fn needs_first_time_setup(&self) -> bool {
        self.first_time
    }

    /// Rule currently being edited, if any.
    pub fn pending_edit(&self) -> Option<&Rule> {
        self.pending_edit.as_ref()
    }

    /// Add a rule from the form, or finish an edit started with
    /// [`begin_edit`](Self::begin_edit).
    ///
    /// The new rule goes to the end of the list so earlier rules keep
    /// precedence.
    pub fn create(&mut self, draft: &RuleDraft) -> Result<Rule> {
        let pending_id = self.pending_edit.as_ref().map(|rule| rule.id.clone());
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|rule| Some(&rule.id) != pending_id.as_ref())
            .cloned()
            .collect();

        let rule = build_rule(&rules, draft)?;
        rules.push(rule.clone());
        self.persist(rules)?;

        self.pending_edit = None;
        self.first_time = false;
        log::info!("Redirect rule added: {} -> {} ({})", rule.source, rule.destination, rule.match_type);
        self.notify()?;
        Ok(rule)
    }

    /// Start editing a rule: returns its fields for the form.
    ///
    /// The rule stays in the store until the edited form is submitted, so
    /// abandoning the edit loses nothing.
    pub fn begin_edit(&mut self, id: &str) -> Result<RuleDraft> {
        let rule = self
            .rule(id)
            .cloned()
            .ok_or_else(|| EditorError::RuleNotFound(id.to_string()))?;
        let draft = RuleDraft::from_rule(&rule);
        self.pending_edit = Some(rule);
        Ok(draft)
    }

    /// Abandon the current edit. The rule is untouched.
    pub fn cancel_edit(&mut self) -> Option<Rule> {
        self.pending_edit.take()
    }

    /// Delete a rule after confirmation.
    pub fn delete(&mut self, id: &str, confirm: &mut dyn Confirm) -> Result<Rule> {
        let rule = self
            .rule(id)
            .cloned()
            .ok_or_else(|| EditorError::RuleNotFound(id.to_string()))?;
        if !confirm.confirm(&Question::DeleteRule { source: &rule.source }) {
            return Err(EditorError::Declined);
        }

        let rules = self.rules.iter().filter(|r| r.id != id).cloned().collect();
        self.persist(rules)?;
        if self.pending_edit.as_ref().is_some_and(|pending| pending.id == id) {
            self.pending_edit = None;
        }
        log::info!("Rule deleted: {}", rule.source);
        self.notify()?;
        Ok(rule)
    }

    /// Flip a rule's enabled flag. Returns the new value.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let enabled = !self
            .rule(id)
            .ok_or_else(|| EditorError::RuleNotFound(id.to_string()))?
            .enabled;
        self.set_rule_enabled(id, enabled)?;
        Ok(enabled)
    }

    /// Set a rule's enabled flag.
    pub fn set_rule_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let mut rules = self.rules.clone();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == id)
            .ok_or_else(|| EditorError::RuleNotFound(id.to_string()))?;
        rule.enabled = enabled;

        self.persist(rules)?;
        log::info!("Rule {} {}", id, if enabled { "enabled" } else { "disabled" });
        self.notify()
    }

    /// Export the current rules.
    pub fn export(&self) -> Result<ExportDocument> {
        if self.rules.is_empty() {
            return Err(EditorError::NothingToExport);
        }
        Ok(ExportDocument::new(self.rules.clone()))
    }

    /// Import rules, asking whether to replace or merge. Returns the number
    /// of rules in the import file.
    pub fn import(&mut self, text: &str, confirm: &mut dyn Confirm) -> Result<usize> {
        let imported = parse_import(text)?;
        let policy = if confirm.confirm(&Question::ImportReplace { count: imported.len() }) {
            ImportPolicy::Replace
        } else {
            ImportPolicy::Merge
        };
        self.apply_import(imported, policy)
    }

    /// Import rules with a fixed policy.
    pub fn import_with_policy(&mut self, text: &str, policy: ImportPolicy) -> Result<usize> {
        let imported = parse_import(text)?;
        self.apply_import(imported, policy)
    }

    fn apply_import(&mut self, imported: Vec<ImportedRule>, policy: ImportPolicy) -> Result<usize> {
        let count = imported.len();
        let rules = apply_import(&self.rules, imported, policy);
        self.persist(rules)?;

        self.pending_edit = None;
        self.first_time = self.rules.is_empty();
        log::info!("Successfully imported {} rules ({:?})", count, policy);
        self.notify()?;
        Ok(count)
    }

    /// Remove every rule after confirmation. Returns how many were removed.
    pub fn clear_all(&mut self, confirm: &mut dyn Confirm) -> Result<usize> {
        let count = self.rules.len();
        if count == 0 {
            return Err(EditorError::NothingToClear);
        }
        if !confirm.confirm(&Question::ClearAll { count }) {
            return Err(EditorError::Declined);
        }

        self.persist(Vec::new())?;
        self.pending_edit = None;
        self.first_time = true;
        log::info!("All rules have been cleared");
        self.notify()?;
        Ok(count)
    }

    /// Save `rules` and adopt them on success.
    fn persist(&mut self, rules: Vec<Rule>) -> Result<()> {
        if let Err(e) = self.store.save(&rules) {
            log::error!("Error saving rules: {}", e);
            return Err(e.into());
        }
        self.rules = rules;
        Ok(())
    }

    fn notify(&self) -> Result<()> {
        self.notifier.notify(Message::UpdateRules).map_err(|e| {
            log::warn!("Rules saved but background not notified: {}", e);
            EditorError::from(e)
        })
    }
}
