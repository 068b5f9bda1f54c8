//! In-memory model of a single test case subtree pulled from the report
//! stream. One `TestCase` is alive at a time; the scan loop drops it before
//! the next one is parsed.

/// A log message attached directly to a keyword invocation
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Message {
    /// Severity level as written in the report, e.g. "FAIL", "INFO"
    pub level: String,
    pub text: String,
}

impl Message {
    pub fn is_fail(&self) -> bool {
        self.level.eq_ignore_ascii_case("FAIL")
    }
}

/// Recorded execution status of a keyword or test
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Status {
    /// Outcome tag as written in the report, e.g. "PASS", "FAIL"
    pub outcome: String,
    pub text: String,
}

impl Status {
    pub fn is_fail(&self) -> bool {
        self.outcome.eq_ignore_ascii_case("FAIL")
    }

    pub fn is_pass(&self) -> bool {
        self.outcome.eq_ignore_ascii_case("PASS")
    }
}

/// One keyword invocation, possibly containing nested invocations
#[derive(Debug, Clone, Default)]
pub struct Keyword {
    /// Name as written in the report (not trimmed)
    pub name: String,
    pub args: Vec<String>,
    pub messages: Vec<Message>,
    pub status: Option<Status>,
    pub children: Vec<Keyword>,
}

impl Keyword {
    /// Candidate failure texts for this invocation: the text of every direct
    /// FAIL message in document order, then the status text if the status is
    /// FAIL, non-empty and not equal to one of the message texts. Repeated
    /// identical messages are all kept; only the status text is deduplicated.
    pub fn fail_texts(&self) -> Vec<&str> {
        let mut texts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.is_fail() && !m.text.is_empty())
            .map(|m| m.text.as_str())
            .collect();

        if let Some(status) = self.status.as_ref().filter(|s| s.is_fail()) {
            if !status.text.is_empty() && !texts.contains(&status.text.as_str()) {
                texts.push(status.text.as_str());
            }
        }

        texts
    }
}

/// One complete test case subtree
#[derive(Debug, Clone, Default)]
pub struct TestCase {
    /// Name as written in the report; empty when the attribute is absent
    pub name: String,
    pub keywords: Vec<Keyword>,
    pub status: Option<Status>,
}

impl TestCase {
    /// Walks every keyword invocation in the subtree, any nesting depth,
    /// in document order (an invocation before its children).
    pub fn all_keywords(&self) -> KeywordIter {
        KeywordIter::new(&self.keywords)
    }
}

pub struct KeywordIter<'a> {
    stack: Vec<&'a Keyword>,
}

impl<'a> KeywordIter<'a> {
    fn new(roots: &'a [Keyword]) -> Self {
        Self {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for KeywordIter<'a> {
    type Item = &'a Keyword;

    fn next(&mut self) -> Option<Self::Item> {
        let kw = self.stack.pop()?;
        self.stack.extend(kw.children.iter().rev());
        Some(kw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(level: &str, text: &str) -> Message {
        Message {
            level: level.to_string(),
            text: text.to_string(),
        }
    }

    fn status(outcome: &str, text: &str) -> Option<Status> {
        Some(Status {
            outcome: outcome.to_string(),
            text: text.to_string(),
        })
    }

    fn named(name: &str) -> Keyword {
        Keyword {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn fail_texts_in_document_order() {
        let kw = Keyword {
            messages: vec![msg("FAIL", "first"), msg("INFO", "skipped"), msg("FAIL", "second")],
            status: status("FAIL", "third"),
            ..Default::default()
        };
        assert_eq!(kw.fail_texts(), vec!["first", "second", "third"]);
    }

    #[test]
    fn fail_texts_dedups_status_against_messages() {
        let kw = Keyword {
            messages: vec![msg("FAIL", "1 != 2")],
            status: status("FAIL", "1 != 2"),
            ..Default::default()
        };
        assert_eq!(kw.fail_texts(), vec!["1 != 2"]);
    }

    #[test]
    fn fail_texts_keeps_repeated_messages() {
        let kw = Keyword {
            messages: vec![msg("FAIL", "boom"), msg("FAIL", "boom")],
            ..Default::default()
        };
        assert_eq!(kw.fail_texts(), vec!["boom", "boom"]);
    }

    #[test]
    fn fail_texts_level_and_outcome_case_insensitive() {
        let kw = Keyword {
            messages: vec![msg("fail", "a")],
            status: status("Fail", "b"),
            ..Default::default()
        };
        assert_eq!(kw.fail_texts(), vec!["a", "b"]);
    }

    #[test]
    fn fail_texts_skips_empty_and_non_fail() {
        let kw = Keyword {
            messages: vec![msg("FAIL", ""), msg("WARN", "nope")],
            status: status("PASS", "passed"),
            ..Default::default()
        };
        assert!(kw.fail_texts().is_empty());
    }

    #[test]
    fn fail_texts_status_only() {
        let kw = Keyword {
            status: status("FAIL", "only status"),
            ..Default::default()
        };
        assert_eq!(kw.fail_texts(), vec!["only status"]);
    }

    #[test]
    fn all_keywords_walks_depth_first() {
        let mut root_a = named("a");
        let mut a_child = named("a1");
        a_child.children.push(named("a1x"));
        root_a.children.push(a_child);
        root_a.children.push(named("a2"));

        let tc = TestCase {
            keywords: vec![root_a, named("b")],
            ..Default::default()
        };

        let order: Vec<&str> = tc.all_keywords().map(|k| k.name.as_str()).collect();
        assert_eq!(order, vec!["a", "a1", "a1x", "a2", "b"]);
    }
}
