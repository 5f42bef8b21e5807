//! Helpers shared by templates.

use k8s_openapi::api::core::v1::Container;
use regex::Regex;
use serde::Deserialize;

use crate::context::Object;
use crate::extract;
use crate::types::Diagnostic;

/// Prefix that inverts a string matcher.
pub const NEGATION_PREFIX: &str = "!";

/// A compiled string predicate: an optionally negated regex, or match-anything.
#[derive(Debug, Clone)]
pub struct StringMatcher {
    regex: Option<Regex>,
    negate: bool,
}

impl StringMatcher {
    /// Compile `expr`. An empty expression matches any string; a leading `!` negates.
    pub fn new(expr: &str) -> Result<Self, regex::Error> {
        if expr.is_empty() {
            return Ok(Self {
                regex: None,
                negate: false,
            });
        }
        let (negate, pattern) = match expr.strip_prefix(NEGATION_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, expr),
        };
        Ok(Self {
            regex: Some(Regex::new(pattern)?),
            negate,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.regex {
            None => true,
            Some(re) => re.is_match(value) != self.negate,
        }
    }
}

/// Parameters of templates that take none; any key is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoParams {}

/// Run `check` against every container (init, regular, ephemeral) of the object's pod spec.
pub fn per_container<F, I>(object: &Object, mut check: F) -> Vec<Diagnostic>
where
    F: FnMut(&Container) -> I,
    I: IntoIterator<Item = Diagnostic>,
{
    let Some(pod_spec) = extract::pod_spec(object.k8s_object()) else {
        return Vec::new();
    };
    extract::all_containers(&pod_spec)
        .iter()
        .flat_map(|c| check(c))
        .collect()
}

/// Render strings as a quoted, space separated list: `["a" "b"]`.
pub fn quoted_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = items.into_iter().map(|s| format!("{:?}", s)).collect();
    format!("[{}]", quoted.join(" "))
}

/// Render regexes as a quoted, space separated list: `["a" "b"]`.
pub fn quoted_patterns(patterns: &[Regex]) -> String {
    quoted_list(patterns.iter().map(Regex::as_str))
}

/// `replicas` or `replica`, by count.
pub fn replicas_noun(count: i32) -> &'static str {
    if count > 1 { "replicas" } else { "replica" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matches_anything() {
        let m = StringMatcher::new("").unwrap();
        assert!(m.matches(""));
        assert!(m.matches("anything"));
    }

    #[test]
    fn test_regex_and_negation() {
        let m = StringMatcher::new("^team-").unwrap();
        assert!(m.matches("team-a"));
        assert!(!m.matches("a-team"));

        let m = StringMatcher::new("!^team-").unwrap();
        assert!(!m.matches("team-a"));
        assert!(m.matches("a-team"));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(StringMatcher::new("(").is_err());
        assert!(StringMatcher::new("!(").is_err());
    }

    #[test]
    fn test_quoted_patterns() {
        let patterns = vec![Regex::new(".*:latest$").unwrap(), Regex::new("^nginx").unwrap()];
        assert_eq!(quoted_patterns(&patterns), r#"[".*:latest$" "^nginx"]"#);
    }

    #[test]
    fn test_quoted_list() {
        assert_eq!(quoted_list(["NET_RAW", "SYS_ADMIN"]), r#"["NET_RAW" "SYS_ADMIN"]"#);
        assert_eq!(quoted_list(Vec::<&str>::new()), "[]");
    }

    #[test]
    fn test_replicas_noun() {
        assert_eq!(replicas_noun(1), "replica");
        assert_eq!(replicas_noun(3), "replicas");
    }
}
