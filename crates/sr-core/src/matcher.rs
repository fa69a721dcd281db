//! Rule Matching
//!
//! Linear scan in store order; the first enabled rule whose predicate
//! holds wins. This runs inside the blocking request callback, so it never
//! allocates more than the lowercased hostname and never fails.

use crate::rule::Rule;
use crate::url::request_hostname;

/// Find the rule that applies to `url`, if any.
///
/// Returns `None` when the URL has no parseable hostname.
pub fn find_matching_rule<'r>(url: &str, rules: &'r [Rule]) -> Option<&'r Rule> {
    let hostname = match request_hostname(url) {
        Some(host) => host,
        None => {
            log::debug!("Unparseable URL, no rule applies: {}", url);
            return None;
        }
    };
    match_hostname(&hostname, rules)
}

/// Match an already lowercased hostname.
pub fn match_hostname<'r>(hostname: &str, rules: &'r [Rule]) -> Option<&'r Rule> {
    rules
        .iter()
        .filter(|rule| rule.enabled)
        .find(|rule| rule_matches(rule, hostname))
}

#[inline]
fn rule_matches(rule: &Rule, hostname: &str) -> bool {
    if rule.source.chars().any(char::is_uppercase) {
        rule.match_type.matches(hostname, &rule.source.to_lowercase())
    } else {
        rule.match_type.matches(hostname, &rule.source)
    }
}

/// Number of enabled rules.
pub fn active_rule_count(rules: &[Rule]) -> usize {
    rules.iter().filter(|rule| rule.enabled).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MatchType;

    fn rule(id: &str, source: &str, match_type: MatchType, enabled: bool) -> Rule {
        Rule {
            id: id.to_string(),
            source: source.to_string(),
            destination: format!("https://{}.example", id),
            match_type,
            enabled,
            created: String::new(),
        }
    }

    #[test]
    fn test_exact_match_ignores_path_query_and_port() {
        let rules = vec![rule("a", "old.com", MatchType::Exact, true)];
        assert_eq!(find_matching_rule("http://old.com/page", &rules).map(|r| r.id.as_str()), Some("a"));
        assert!(find_matching_rule("https://old.com:8443/x?y=1#z", &rules).is_some());
        assert!(find_matching_rule("http://OLD.COM", &rules).is_some());
        assert!(find_matching_rule("http://sub.old.com", &rules).is_none());
    }

    #[test]
    fn test_contains_over_matches() {
        let rules = vec![rule("a", "old.com", MatchType::Contains, true)];
        assert!(find_matching_rule("http://sub.old.com.evil.net", &rules).is_some());
        assert!(find_matching_rule("http://new.com", &rules).is_none());
    }

    #[test]
    fn test_startswith() {
        let rules = vec![rule("a", "news.", MatchType::StartsWith, true)];
        assert!(find_matching_rule("https://news.example.org/", &rules).is_some());
        assert!(find_matching_rule("https://fakenews.example.org/", &rules).is_none());
    }

    #[test]
    fn test_disabled_rules_never_match() {
        let rules = vec![
            rule("off", "old.com", MatchType::Exact, false),
            rule("on", "old.com", MatchType::Contains, true),
        ];
        let found = find_matching_rule("http://old.com", &rules).unwrap();
        assert_eq!(found.id, "on");
        assert!(found.enabled);

        let all_off = vec![rule("off", "old.com", MatchType::Exact, false)];
        assert!(find_matching_rule("http://old.com", &all_off).is_none());
    }

    #[test]
    fn test_first_match_wins_regardless_of_type() {
        let rules = vec![
            rule("loose", "old", MatchType::Contains, true),
            rule("strict", "old.com", MatchType::Exact, true),
        ];
        assert_eq!(find_matching_rule("http://old.com", &rules).unwrap().id, "loose");

        let reversed: Vec<Rule> = rules.into_iter().rev().collect();
        assert_eq!(find_matching_rule("http://old.com", &reversed).unwrap().id, "strict");
    }

    #[test]
    fn test_uppercase_source_still_matches() {
        let rules = vec![rule("a", "Old.Com", MatchType::Exact, true)];
        assert!(find_matching_rule("http://old.com", &rules).is_some());
    }

    #[test]
    fn test_non_ascii_hosts_fold_case_like_sources() {
        let rules = vec![rule("r1", "bücher.de", MatchType::Exact, true)];
        assert!(find_matching_rule("https://BÜCHER.de/", &rules).is_some());

        let rules = vec![rule("r1", "Bücher.de", MatchType::Exact, true)];
        assert!(find_matching_rule("https://bücher.de/", &rules).is_some());
    }

    #[test]
    fn test_unparseable_url_fails_closed() {
        let rules = vec![rule("a", "old", MatchType::Contains, true)];
        assert!(find_matching_rule("old.com", &rules).is_none());
        assert!(find_matching_rule("", &rules).is_none());
        assert!(find_matching_rule("http://", &rules).is_none());
    }

    #[test]
    fn test_active_rule_count() {
        let rules = vec![
            rule("a", "a.com", MatchType::Exact, true),
            rule("b", "b.com", MatchType::Exact, false),
            rule("c", "c.com", MatchType::Exact, true),
        ];
        assert_eq!(active_rule_count(&rules), 2);
    }
}
