//! Rule export and import
//!
//! Export writes `{ version, exportDate, rules }`. Import accepts any JSON
//! document with a top-level `rules` array and fills in whatever fields
//! older exports did not carry. Sources are stored as found in the file so
//! an export imported back yields the same rules.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::rule::{generate_rule_id, now_iso8601, MatchType, Rule};

/// Format version written into exports.
pub const EXPORT_VERSION: &str = "1.0";

// =============================================================================
// Export
// =============================================================================

/// Exported rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export, export_to = "bindings/"))]
pub struct ExportDocument {
    pub version: String,
    pub export_date: String,
    pub rules: Vec<Rule>,
}

impl ExportDocument {
    /// Snapshot `rules` with the current time as export date.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: now_iso8601(),
            rules,
        }
    }

    /// Pretty-printed JSON, two-space indent.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Suggested download name, e.g. `smart-redirect-rules-2024-01-31.json`.
pub fn export_file_name() -> String {
    format!("smart-redirect-rules-{}.json", Utc::now().format("%Y-%m-%d"))
}

// =============================================================================
// Import
// =============================================================================

/// What to do with the current rules on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Discard current rules and adopt the imported list
    Replace,
    /// Keep current rules and append imported rules with new sources
    Merge,
}

/// A rule as found in an import file. Only `source` and `destination`
/// are required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedRule {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub created: Option<String>,
}

impl ImportedRule {
    /// Fill in missing fields.
    fn into_rule(self) -> Rule {
        Rule {
            id: non_empty(self.id).unwrap_or_else(generate_rule_id),
            source: self.source,
            destination: self.destination,
            match_type: self.match_type,
            enabled: self.enabled != Some(false),
            created: non_empty(self.created).unwrap_or_else(now_iso8601),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Check the chosen file name before reading it.
pub fn ensure_json_file_name(name: &str) -> Result<(), ParseError> {
    if name.to_ascii_lowercase().ends_with(".json") {
        Ok(())
    } else {
        Err(ParseError::NotJsonFile)
    }
}

/// Parse the `rules` array of an import document.
pub fn parse_import(text: &str) -> Result<Vec<ImportedRule>, ParseError> {
    let document: Value = serde_json::from_str(text)?;
    let entries = document
        .get("rules")
        .and_then(Value::as_array)
        .ok_or(ParseError::InvalidImportFormat)?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            ImportedRule::deserialize(entry).map_err(|e| ParseError::InvalidRule {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Combine `current` with `imported` under `policy`.
///
/// Merge keeps the current rules untouched and appends imported rules
/// whose source, compared case-insensitively, is not already present.
/// Imported ids that are missing or already taken are regenerated.
pub fn apply_import(current: &[Rule], imported: Vec<ImportedRule>, policy: ImportPolicy) -> Vec<Rule> {
    let (mut rules, incoming): (Vec<Rule>, Vec<ImportedRule>) = match policy {
        ImportPolicy::Replace => (Vec::new(), imported),
        ImportPolicy::Merge => {
            let existing: HashSet<String> = current.iter().map(|rule| rule.source.to_lowercase()).collect();
            let incoming = imported
                .into_iter()
                .filter(|rule| !existing.contains(&rule.source.to_lowercase()))
                .collect();
            (current.to_vec(), incoming)
        }
    };

    let mut seen_ids: HashSet<String> = rules.iter().map(|rule| rule.id.clone()).collect();
    for entry in incoming {
        let mut rule = entry.into_rule();
        if !seen_ids.insert(rule.id.clone()) {
            rule.id = generate_rule_id();
            seen_ids.insert(rule.id.clone());
        }
        rules.push(rule);
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(source: &str) -> Rule {
        Rule::new(source, format!("https://{}.example", source), MatchType::Exact)
    }

    fn sources(rules: &[Rule]) -> Vec<&str> {
        rules.iter().map(|r| r.source.as_str()).collect()
    }

    #[test]
    fn test_export_document_shape() {
        let doc = ExportDocument::new(vec![rule("a.com")]);
        let value: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], "1.0");
        assert!(value["exportDate"].as_str().unwrap().ends_with('Z'));
        assert_eq!(value["rules"][0]["source"], "a.com");
        assert!(doc.to_json().unwrap().contains("\n  \"version\""));
    }

    #[test]
    fn test_export_file_name() {
        let name = export_file_name();
        assert!(name.starts_with("smart-redirect-rules-"));
        assert!(ensure_json_file_name(&name).is_ok());
        assert!(matches!(ensure_json_file_name("rules.txt"), Err(ParseError::NotJsonFile)));
    }

    #[test]
    fn test_parse_import_requires_rules_array() {
        assert!(matches!(parse_import("{nope"), Err(ParseError::InvalidJson(_))));
        assert!(matches!(parse_import("{}"), Err(ParseError::InvalidImportFormat)));
        assert!(matches!(parse_import(r#"{"rules": {}}"#), Err(ParseError::InvalidImportFormat)));
        assert!(matches!(parse_import("[]"), Err(ParseError::InvalidImportFormat)));
        assert!(parse_import(r#"{"rules": [], "extra": 1}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_import_reports_bad_entry() {
        let err = parse_import(r#"{"rules": [{"source": "a.com", "destination": "https://x"}, {"source": "b.com"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidRule { index: 1, .. }));
    }

    #[test]
    fn test_import_fills_missing_fields() {
        let imported = parse_import(r#"{"rules": [{"source": "A.com", "destination": "https://x.com"}]}"#).unwrap();
        let rules = apply_import(&[], imported, ImportPolicy::Replace);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].id.starts_with("rule_"));
        assert_eq!(rules[0].source, "A.com");
        assert_eq!(rules[0].match_type, MatchType::Exact);
        assert!(rules[0].enabled);
        assert!(!rules[0].created.is_empty());
    }

    #[test]
    fn test_import_keeps_explicit_fields() {
        let imported = parse_import(
            r#"{"rules": [{"id": "rule_7", "source": "a.com", "destination": "https://x.com",
                "matchType": "contains", "enabled": false, "created": "2020-01-01T00:00:00.000Z"}]}"#,
        )
        .unwrap();
        let rules = apply_import(&[], imported, ImportPolicy::Replace);
        assert_eq!(rules[0].id, "rule_7");
        assert_eq!(rules[0].match_type, MatchType::Contains);
        assert!(!rules[0].enabled);
        assert_eq!(rules[0].created, "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_merge_skips_existing_sources() {
        let current = vec![rule("a.com")];
        let imported = parse_import(
            r#"{"rules": [
                {"source": "A.COM", "destination": "https://x.com"},
                {"source": "b.com", "destination": "https://y.com"}
            ]}"#,
        )
        .unwrap();
        let rules = apply_import(&current, imported, ImportPolicy::Merge);
        assert_eq!(sources(&rules), vec!["a.com", "b.com"]);
        assert_eq!(rules[0], current[0]);
    }

    #[test]
    fn test_merge_does_not_dedupe_within_batch() {
        let imported = parse_import(
            r#"{"rules": [
                {"source": "b.com", "destination": "https://y.com"},
                {"source": "b.com", "destination": "https://z.com"}
            ]}"#,
        )
        .unwrap();
        let rules = apply_import(&[rule("a.com")], imported, ImportPolicy::Merge);
        assert_eq!(sources(&rules), vec!["a.com", "b.com", "b.com"]);
    }

    #[test]
    fn test_colliding_ids_are_regenerated() {
        let current = vec![rule("a.com")];
        let text = format!(
            r#"{{"rules": [{{"id": "{}", "source": "b.com", "destination": "https://y.com"}}]}}"#,
            current[0].id
        );
        let rules = apply_import(&current, parse_import(&text).unwrap(), ImportPolicy::Merge);
        assert_eq!(rules.len(), 2);
        assert_ne!(rules[0].id, rules[1].id);
        assert_eq!(rules[0].id, current[0].id);
    }

    #[test]
    fn test_replace_discards_current() {
        let imported = parse_import(r#"{"rules": [{"source": "b.com", "destination": "https://y.com"}]}"#).unwrap();
        let rules = apply_import(&[rule("a.com")], imported, ImportPolicy::Replace);
        assert_eq!(sources(&rules), vec!["b.com"]);
    }

    #[test]
    fn test_export_then_replace_import_round_trips() {
        let mut original = vec![rule("a.com"), rule("b.com")];
        original[1].enabled = false;
        original[1].match_type = MatchType::StartsWith;

        let text = ExportDocument::new(original.clone()).to_json().unwrap();
        let restored = apply_import(&[], parse_import(&text).unwrap(), ImportPolicy::Replace);
        assert_eq!(restored, original);
    }

    #[test]
    fn test_www_source_survives_replace_import() {
        let original = vec![Rule::new("www.example.com", "https://calm.example", MatchType::Exact)];
        let text = ExportDocument::new(original.clone()).to_json().unwrap();

        let restored = apply_import(&[], parse_import(&text).unwrap(), ImportPolicy::Replace);
        assert_eq!(restored, original);
        assert!(crate::matcher::find_matching_rule("https://www.example.com/", &restored).is_some());
    }

    #[test]
    fn test_merge_leaves_current_rules_untouched() {
        let current = vec![Rule::new("www.example.com", "https://calm.example", MatchType::Exact)];
        let imported = parse_import(r#"{"rules": [{"source": "b.com", "destination": "https://y.com"}]}"#).unwrap();

        let merged = apply_import(&current, imported, ImportPolicy::Merge);
        assert_eq!(merged[0], current[0]);
        assert_eq!(sources(&merged), vec!["www.example.com", "b.com"]);
    }
}
