//! Redirect rule model
//!
//! A rule maps a hostname (or hostname fragment) to a fixed destination
//! URL. Rules are persisted as JSON objects with camelCase keys, so older
//! stored data and imported files deserialize through the same types.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Length of the random suffix in generated rule ids.
const ID_SUFFIX_LEN: usize = 9;

// =============================================================================
// Match Type
// =============================================================================

/// How a rule's source is compared with a request hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export, export_to = "bindings/"))]
pub enum MatchType {
    /// Hostname equals the source
    #[default]
    Exact,
    /// Hostname contains the source
    Contains,
    /// Hostname starts with the source
    StartsWith,
}

impl MatchType {
    /// Map a persisted name to a match type.
    ///
    /// Anything unrecognized is treated as `exact`, which is how rules
    /// written by older versions behave.
    pub fn from_name(name: &str) -> Self {
        match name {
            "exact" => Self::Exact,
            "contains" => Self::Contains,
            "startswith" => Self::StartsWith,
            _ => Self::Exact,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
        }
    }

    /// Apply this match type to an already lowercased hostname.
    #[inline]
    pub fn matches(&self, hostname: &str, source: &str) -> bool {
        match self {
            Self::Exact => hostname == source,
            Self::Contains => hostname.contains(source),
            Self::StartsWith => hostname.starts_with(source),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MatchType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name.as_deref().map(Self::from_name).unwrap_or_default())
    }
}

// =============================================================================
// Rule
// =============================================================================

/// A persisted redirect rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export, export_to = "bindings/"))]
pub struct Rule {
    pub id: String,
    /// Normalized hostname or hostname fragment
    pub source: String,
    /// Absolute URL to load instead
    pub destination: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// ISO-8601 creation time
    #[serde(default)]
    pub created: String,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Create an enabled rule with a fresh id and creation time.
    ///
    /// The caller is responsible for validating and normalizing `source`
    /// and `destination`.
    pub fn new(source: impl Into<String>, destination: impl Into<String>, match_type: MatchType) -> Self {
        Self {
            id: generate_rule_id(),
            source: source.into(),
            destination: destination.into(),
            match_type,
            enabled: true,
            created: now_iso8601(),
        }
    }
}

/// Generate a rule id of the form `rule_<unix millis>_<9 base36 chars>`.
pub fn generate_rule_id() -> String {
    let mut bits = uuid::Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for _ in 0..ID_SUFFIX_LEN {
        let digit = (bits % 36) as u32;
        suffix.push(char::from_digit(digit, 36).unwrap_or('0'));
        bits /= 36;
    }
    format!("rule_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Current UTC time with millisecond precision, e.g. `2024-01-31T12:00:00.000Z`.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_type_predicates() {
        assert!(MatchType::Exact.matches("old.com", "old.com"));
        assert!(!MatchType::Exact.matches("sub.old.com", "old.com"));
        assert!(MatchType::Contains.matches("sub.old.com.evil.net", "old.com"));
        assert!(MatchType::StartsWith.matches("old.com.evil.net", "old.com"));
        assert!(!MatchType::StartsWith.matches("sub.old.com", "old.com"));
    }

    #[test]
    fn test_unknown_match_type_falls_back_to_exact() {
        assert_eq!(MatchType::from_name("regex"), MatchType::Exact);
        assert_eq!(MatchType::from_name("StartsWith"), MatchType::Exact);
        assert_eq!(MatchType::from_name("startswith"), MatchType::StartsWith);
    }

    #[test]
    fn test_rule_deserialize_defaults() {
        let rule: Rule = serde_json::from_str(
            r#"{"id":"rule_1","source":"old.com","destination":"https://new.com"}"#,
        )
        .unwrap();
        assert_eq!(rule.match_type, MatchType::Exact);
        assert!(rule.enabled);
        assert!(rule.created.is_empty());

        let rule: Rule = serde_json::from_str(
            r#"{"id":"rule_2","source":"old.com","destination":"https://new.com","matchType":"wildcard","enabled":false}"#,
        )
        .unwrap();
        assert_eq!(rule.match_type, MatchType::Exact);
        assert!(!rule.enabled);
    }

    #[test]
    fn test_rule_serializes_camel_case() {
        let rule = Rule {
            id: "rule_1".to_string(),
            source: "old.com".to_string(),
            destination: "https://new.com".to_string(),
            match_type: MatchType::StartsWith,
            enabled: true,
            created: "2024-01-31T12:00:00.000Z".to_string(),
        };
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["matchType"], "startswith");
        assert_eq!(value["created"], "2024-01-31T12:00:00.000Z");
    }

    #[test]
    fn test_generated_ids_are_unique_and_shaped() {
        let a = generate_rule_id();
        let b = generate_rule_id();
        assert_ne!(a, b);

        let parts: Vec<&str> = a.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "rule");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_now_iso8601_shape() {
        let now = now_iso8601();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2024-01-31T12:00:00.000Z".len());
    }
}
