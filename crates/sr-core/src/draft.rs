//! Rule form input and its validation
//!
//! Shared by the options page (full form) and the popup (quick add), and
//! exported to the extension scripts through the wasm bindings.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::rule::{MatchType, Rule};
use crate::url::{clean_source, is_absolute_url};

/// Minimum length of the raw source input.
pub const MIN_SOURCE_LEN: usize = 3;

/// Contents of the add-rule form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export, export_to = "bindings/"))]
pub struct RuleDraft {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub match_type: MatchType,
}

impl RuleDraft {
    pub fn new(source: impl Into<String>, destination: impl Into<String>, match_type: MatchType) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            match_type,
        }
    }

    /// Prefill the form from an existing rule.
    pub fn from_rule(rule: &Rule) -> Self {
        Self::new(rule.source.clone(), rule.destination.clone(), rule.match_type)
    }
}

/// Check the destination field.
pub fn validate_destination(destination: &str) -> Result<(), ValidationError> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(ValidationError::MissingDestination);
    }
    if !is_absolute_url(destination) {
        return Err(ValidationError::InvalidDestination);
    }
    Ok(())
}

/// Validate a draft and return its normalized source.
pub fn validate_draft(draft: &RuleDraft) -> Result<String, ValidationError> {
    let source = draft.source.trim();
    if source.chars().count() < MIN_SOURCE_LEN {
        return Err(ValidationError::SourceTooShort);
    }
    validate_destination(&draft.destination)?;
    if source.contains("://") {
        return Err(ValidationError::SourceHasScheme);
    }
    Ok(clean_source(source))
}

/// Existing rule with the same source (case-insensitive) and match type.
pub fn find_duplicate<'r>(rules: &'r [Rule], source: &str, match_type: MatchType) -> Option<&'r Rule> {
    rules
        .iter()
        .find(|rule| rule.match_type == match_type && rule.source.to_lowercase() == source.to_lowercase())
}

/// Validate `draft` against `rules` and build the new rule.
///
/// Does not modify `rules`; the caller appends the result.
pub fn build_rule(rules: &[Rule], draft: &RuleDraft) -> Result<Rule, ValidationError> {
    let source = validate_draft(draft)?;
    if find_duplicate(rules, &source, draft.match_type).is_some() {
        return Err(ValidationError::DuplicateRule);
    }
    Ok(Rule::new(source, draft.destination.trim(), draft.match_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_order() {
        let err = validate_draft(&RuleDraft::new("ab", "", MatchType::Exact)).unwrap_err();
        assert_eq!(err, ValidationError::SourceTooShort);

        let err = validate_draft(&RuleDraft::new("old.com", "  ", MatchType::Exact)).unwrap_err();
        assert_eq!(err, ValidationError::MissingDestination);

        let err = validate_draft(&RuleDraft::new("old.com", "new.com", MatchType::Exact)).unwrap_err();
        assert_eq!(err, ValidationError::InvalidDestination);

        let err = validate_draft(&RuleDraft::new("https://old.com", "https://new.com", MatchType::Exact))
            .unwrap_err();
        assert_eq!(err, ValidationError::SourceHasScheme);
    }

    #[test]
    fn test_validate_normalizes_source() {
        let source = validate_draft(&RuleDraft::new(" www.Old.com/ ", "https://new.com", MatchType::Exact)).unwrap();
        assert_eq!(source, "old.com");
    }

    #[test]
    fn test_duplicates_depend_on_match_type() {
        let existing = vec![Rule::new("old.com", "https://new.com", MatchType::Exact)];

        let err = build_rule(&existing, &RuleDraft::new("OLD.com", "https://other.com", MatchType::Exact))
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateRule);

        let rule = build_rule(&existing, &RuleDraft::new("old.com", "https://other.com", MatchType::Contains))
            .unwrap();
        assert_eq!(rule.source, "old.com");
        assert_eq!(rule.match_type, MatchType::Contains);
        assert!(rule.enabled);
        assert_ne!(rule.id, existing[0].id);
    }

    #[test]
    fn test_build_rule_trims_destination() {
        let rule = build_rule(&[], &RuleDraft::new("old.com", " https://new.com ", MatchType::Exact)).unwrap();
        assert_eq!(rule.destination, "https://new.com");
        assert!(!rule.created.is_empty());
    }
}
