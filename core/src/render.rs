//! Console output for matches and scan summaries. The exact shape of these
//! blocks is load-bearing: people grep and copy/paste them, so every label,
//! ruler and truncation marker is kept stable.

use std::io::{self, Write};

use quick_xml::escape::{escape, partial_escape};

use crate::report::Keyword;
use crate::scan::{ScanOutcome, TestTally};

/// Failure texts longer than this are shortened unless full output is on
const PREVIEW_MAX_CHARS: usize = 800;
/// Number of argument values printed before eliding the rest
const SHOWN_ARGS: usize = 6;

/// Output options for a rendered match block
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Print the whole failure text instead of the preview
    pub full_text: bool,
    /// Print the serialized invocation subtree
    pub keyword_xml: bool,
    /// Character cap for the serialized subtree; 0 disables the cap
    pub keyword_xml_max_chars: usize,
    /// Print the first few argument values
    pub show_args: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            full_text: false,
            keyword_xml: true,
            keyword_xml_max_chars: 200_000,
            show_args: false,
        }
    }
}

/// One failure text that survived the filter chain
#[derive(Debug)]
pub struct Match<'a> {
    /// 1-based sequence number of this match
    pub seq: usize,
    pub test_name: &'a str,
    pub keyword: &'a Keyword,
    pub fail_text: &'a str,
}

/// Writes one numbered match block
pub fn write_match<W: Write>(out: &mut W, m: &Match, opts: &RenderOptions) -> io::Result<()> {
    let test_name = if m.test_name.is_empty() {
        "(unnamed test)"
    } else {
        m.test_name
    };
    let header = format!("[{}] test={} | kw={}", m.seq, test_name, m.keyword.name.trim());
    let ruler = "=".repeat(header.chars().count());
    writeln!(out, "{ruler}")?;
    writeln!(out, "{header}")?;
    writeln!(out, "{ruler}")?;

    if opts.keyword_xml {
        let xml = keyword_to_xml(m.keyword);
        let cap = opts.keyword_xml_max_chars;
        writeln!(out, "kw xml:")?;
        if cap > 0 && xml.chars().count() > cap {
            writeln!(out, "{}\n...(kw truncated)", truncate_chars(&xml, cap))?;
        } else {
            writeln!(out, "{xml}")?;
        }
        writeln!(out)?;
    }

    if opts.show_args && !m.keyword.args.is_empty() {
        writeln!(out, "args:")?;
        for arg in m.keyword.args.iter().take(SHOWN_ARGS) {
            writeln!(out, "  - {arg}")?;
        }
        if m.keyword.args.len() > SHOWN_ARGS {
            writeln!(out, "  ... ({} more)", m.keyword.args.len() - SHOWN_ARGS)?;
        }
    }

    if opts.full_text {
        writeln!(out, "FAIL text:")?;
        writeln!(out, "{}", m.fail_text)?;
    } else {
        writeln!(out, "FAIL text (preview):")?;
        if m.fail_text.chars().count() > PREVIEW_MAX_CHARS {
            writeln!(out, "{} …(truncated)", truncate_chars(m.fail_text, PREVIEW_MAX_CHARS))?;
        } else {
            writeln!(out, "{}", m.fail_text)?;
        }
    }
    writeln!(out)
}

/// Writes the end-of-scan summary line, plus the broaden-the-search tip when
/// the scan ran to completion without a single match
pub fn write_summary<W: Write>(out: &mut W, outcome: &ScanOutcome) -> io::Result<()> {
    if outcome.reached_limit {
        writeln!(
            out,
            "Stopped after {} matches (limit). Searched FAIL keywords: {}.",
            outcome.matches, outcome.failing_keywords
        )
    } else {
        writeln!(
            out,
            "Done. Found {} matches. Searched FAIL keywords: {}.",
            outcome.matches, outcome.failing_keywords
        )?;
        if outcome.matches == 0 {
            writeln!(
                out,
                "Tip: try --operator any, drop --jsonish, or use --keyword any to broaden the search."
            )?;
        }
        Ok(())
    }
}

/// Writes the pass/fail/total test tally
pub fn write_tally<W: Write>(out: &mut W, tally: &TestTally) -> io::Result<()> {
    writeln!(
        out,
        "Tests: {} pass, {} fail, {} total.",
        tally.passed, tally.failed, tally.total
    )
}

/// Truncates to at most `max` characters, never splitting a code point
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Serializes an invocation subtree back to XML for copy/paste. Children are
/// grouped by kind (args, messages, nested invocations, status last); the
/// document's interleaving is not recorded in the model.
pub fn keyword_to_xml(kw: &Keyword) -> String {
    let mut out = String::new();
    push_keyword(&mut out, kw);
    out
}

fn push_keyword(out: &mut String, kw: &Keyword) {
    out.push_str("<kw");
    if !kw.name.is_empty() {
        out.push_str(" name=\"");
        out.push_str(&escape(&kw.name));
        out.push('"');
    }
    if kw.args.is_empty() && kw.messages.is_empty() && kw.children.is_empty() && kw.status.is_none()
    {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for arg in &kw.args {
        if arg.is_empty() {
            out.push_str("<arg/>");
        } else {
            out.push_str("<arg>");
            out.push_str(&partial_escape(arg));
            out.push_str("</arg>");
        }
    }
    for msg in &kw.messages {
        out.push_str("<msg level=\"");
        out.push_str(&escape(&msg.level));
        out.push('"');
        if msg.text.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            out.push_str(&partial_escape(&msg.text));
            out.push_str("</msg>");
        }
    }
    for child in &kw.children {
        push_keyword(out, child);
    }
    if let Some(status) = &kw.status {
        out.push_str("<status status=\"");
        out.push_str(&escape(&status.outcome));
        out.push('"');
        if status.text.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            out.push_str(&partial_escape(&status.text));
            out.push_str("</status>");
        }
    }
    out.push_str("</kw>");
}
