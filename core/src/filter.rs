//! Filter predicates applied to invocation names and candidate failure
//! texts. All of these are plain substring heuristics over human-readable
//! messages; exact semantics matter more than cleverness here.

use strum::Display;

/// Invocation-name filter built from the `--keyword` argument
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum KeywordFilter {
    /// Every named invocation passes
    #[default]
    Any,
    /// Case-insensitive substring on the invocation name (held lowercased)
    Substring(String),
}

impl KeywordFilter {
    /// The special pattern "any" (trimmed, any case) disables name filtering
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.trim().to_lowercase();
        if pattern == "any" {
            Self::Any
        } else {
            Self::Substring(pattern)
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Substring(pattern) => name.to_lowercase().contains(pattern.as_str()),
        }
    }
}

/// Comparison-operator heuristic. This one is always applied: `Any` does not
/// disable it but widens it to either operator.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Display)]
pub enum OperatorFilter {
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "==")]
    Equal,
    #[default]
    #[strum(serialize = "any")]
    Any,
}

impl OperatorFilter {
    pub fn matches(self, text: &str) -> bool {
        match self {
            Self::NotEqual => text.contains("!="),
            Self::Equal => text.contains("=="),
            Self::Any => text.contains("!=") || text.contains("=="),
        }
    }
}

/// Heuristic for "looks like it contains JSON/arrays"
pub fn looks_jsonish(text: &str) -> bool {
    text.contains('{') || text.contains('[')
}

/// The per-text filter chain, evaluated short-circuit
#[derive(Debug, Clone, Default)]
pub struct TextFilters {
    /// Required literal substring (case-sensitive); `None` disables
    pub contains: Option<String>,
    pub operator: OperatorFilter,
    /// Require [`looks_jsonish`] when set
    pub jsonish_only: bool,
}

impl TextFilters {
    pub fn matches(&self, text: &str) -> bool {
        if let Some(needle) = self.contains.as_deref() {
            if !text.contains(needle) {
                return false;
            }
        }
        if !self.operator.matches(text) {
            return false;
        }
        if self.jsonish_only && !looks_jsonish(text) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_any_spellings_disable_the_filter() {
        for pattern in ["any", "ANY", " Any "] {
            let f = KeywordFilter::new(pattern);
            assert_eq!(f, KeywordFilter::Any);
            assert!(f.matches("whatever"));
        }
    }

    #[test]
    fn keyword_substring_is_case_insensitive() {
        let f = KeywordFilter::new("should be equal");
        assert!(f.matches("BuiltIn.Should Be Equal"));
        assert!(f.matches("SHOULD BE EQUAL AS STRINGS"));
        assert!(!f.matches("Log Message"));
    }

    #[test]
    fn keyword_empty_pattern_matches_every_name() {
        let f = KeywordFilter::new("  ");
        assert!(f.matches("anything"));
    }

    #[test]
    fn operator_variants() {
        assert!(OperatorFilter::NotEqual.matches("1 != 2"));
        assert!(!OperatorFilter::NotEqual.matches("1 == 1"));
        assert!(OperatorFilter::Equal.matches("1 == 1"));
        assert!(!OperatorFilter::Equal.matches("1 != 2"));
        assert!(OperatorFilter::Any.matches("1 != 2"));
        assert!(OperatorFilter::Any.matches("1 == 1"));
        assert!(!OperatorFilter::Any.matches("no comparison here"));
    }

    #[test]
    fn operator_display_matches_cli_spelling() {
        assert_eq!(OperatorFilter::NotEqual.to_string(), "!=");
        assert_eq!(OperatorFilter::Equal.to_string(), "==");
        assert_eq!(OperatorFilter::Any.to_string(), "any");
    }

    #[test]
    fn jsonish_heuristic() {
        assert!(looks_jsonish("{\"a\": 1}"));
        assert!(looks_jsonish("items: [1, 2]"));
        assert!(!looks_jsonish("plain text"));
    }

    #[test]
    fn contains_is_case_sensitive() {
        let f = TextFilters {
            contains: Some("Error".to_string()),
            operator: OperatorFilter::Any,
            jsonish_only: false,
        };
        assert!(f.matches("Error: 1 != 2"));
        assert!(!f.matches("error: 1 != 2"));
    }

    #[test]
    fn chain_requires_every_enabled_filter() {
        let f = TextFilters {
            contains: Some("expected".to_string()),
            operator: OperatorFilter::NotEqual,
            jsonish_only: true,
        };
        assert!(f.matches("expected {\"a\": 1} != {\"a\": 2}"));
        assert!(!f.matches("expected 1 != 2"));
        assert!(!f.matches("{\"a\": 1} != {\"a\": 2}"));
        assert!(!f.matches("expected {\"a\": 1} == {\"a\": 1}"));
    }
}
