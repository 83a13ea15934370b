//! Wildcard-to-regex translation for `EXCLUDE_HEADERS` (`spec.md` §4.D).
//!
//! The teacher's tree has no pattern matching at all; `regex` is pulled in
//! here the way `willrnch-fastwebsockets`'s test helpers reach for
//! `regex` to match against protocol-error messages, generalized from
//! "match a message" to "match a header name". Patterns use a single
//! wildcard metacharacter (`*`), anchored and case-insensitive, so
//! `"x-forwarded-*"` matches `X-Forwarded-For` but not `x-forwarded` alone
//! unless the pattern ends without a trailing `*`.

use regex::Regex;

pub fn wildcard_to_regex(pattern: &str) -> Regex {
    let mut escaped = String::with_capacity(pattern.len() * 2 + 8);
    escaped.push_str("(?i)^");
    for part in pattern.split('*') {
        if !escaped.ends_with('^') {
            escaped.push_str(".*");
        }
        escaped.push_str(&regex::escape(part));
    }
    escaped.push('$');
    Regex::new(&escaped).expect("escaped wildcard pattern is always a valid regex")
}

pub fn matches_any(patterns: &[String], candidate: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| wildcard_to_regex(pattern).is_match(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_suffix_matches_prefix_family() {
        let re = wildcard_to_regex("x-forwarded-*");
        assert!(re.is_match("X-Forwarded-For"));
        assert!(re.is_match("x-forwarded-proto"));
        assert!(!re.is_match("x-forwarded"));
    }

    #[test]
    fn exact_pattern_without_wildcard_is_literal() {
        let re = wildcard_to_regex("authorization");
        assert!(re.is_match("Authorization"));
        assert!(!re.is_match("authorization-token"));
    }

    #[test]
    fn matches_any_checks_full_list() {
        let patterns = vec!["cookie".to_string(), "x-api-*".to_string()];
        assert!(matches_any(&patterns, "X-Api-Key"));
        assert!(matches_any(&patterns, "Cookie"));
        assert!(!matches_any(&patterns, "Accept"));
    }
}
