//! The scan loop: pull test cases off the stream one at a time, walk their
//! invocations, extract failure texts, filter, render, and stop at the
//! match limit.

use std::io::{BufRead, Write};
use std::path::Path;

use log::*;

use crate::filter::{KeywordFilter, TextFilters};
use crate::render::{self, Match, RenderOptions};
use crate::report::TestCase;
use crate::stream::TestCaseStream;
use crate::ScanError;

/// Everything configurable about one scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub keyword: KeywordFilter,
    pub text: TextFilters,
    /// Maximum number of matches to print before stopping
    pub limit: usize,
    pub render: RenderOptions,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            keyword: KeywordFilter::default(),
            text: TextFilters::default(),
            limit: 20,
            render: RenderOptions::default(),
        }
    }
}

/// Counters accumulated over one scan
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ScanOutcome {
    /// Matches printed
    pub matches: usize,
    /// Invocations that passed the name filter and yielded failure texts
    pub failing_keywords: usize,
    /// The scan stopped early because the match limit was reached
    pub reached_limit: bool,
    pub tests: TestTally,
}

/// Pass/fail/total tally over the test cases pulled from the stream
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct TestTally {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl TestTally {
    fn record(&mut self, test: &TestCase) {
        self.total += 1;
        if let Some(status) = &test.status {
            if status.is_pass() {
                self.passed += 1;
            } else if status.is_fail() {
                self.failed += 1;
            }
        }
    }
}

/// Scans a report file, writing match blocks to `out` as they are found
pub fn scan_report<P, W>(path: P, opts: &ScanOptions, out: &mut W) -> Result<ScanOutcome, ScanError>
where
    P: AsRef<Path>,
    W: Write,
{
    let stream = TestCaseStream::open(path)?;
    scan_stream(stream, opts, out)
}

/// Scans an already-open report stream. Each test case is dropped before
/// the next one is pulled.
pub fn scan_stream<R, W>(
    stream: TestCaseStream<R>,
    opts: &ScanOptions,
    out: &mut W,
) -> Result<ScanOutcome, ScanError>
where
    R: BufRead,
    W: Write,
{
    let mut outcome = ScanOutcome::default();

    for test in stream {
        let test = test?;
        outcome.tests.record(&test);
        debug!("scanning test case {:?}", test.name);

        for kw in test.all_keywords() {
            let kw_name = kw.name.trim();
            if kw_name.is_empty() {
                continue;
            }
            if !opts.keyword.matches(kw_name) {
                continue;
            }
            let fail_texts = kw.fail_texts();
            if fail_texts.is_empty() {
                continue;
            }
            outcome.failing_keywords += 1;

            for fail_text in fail_texts {
                if !opts.text.matches(fail_text) {
                    continue;
                }
                outcome.matches += 1;
                let m = Match {
                    seq: outcome.matches,
                    test_name: &test.name,
                    keyword: kw,
                    fail_text,
                };
                render::write_match(out, &m, &opts.render)?;

                if outcome.matches >= opts.limit {
                    outcome.reached_limit = true;
                    return Ok(outcome);
                }
            }
        }
    }

    Ok(outcome)
}
