//! Find useful FAIL message examples in a large Robot Framework output.xml.
//!
//! The report is stream-parsed one test case at a time, so memory stays
//! bounded even for very large files. For BuiltIn keywords like
//! "Should Be Equal" the `<arg>` values are often variables/expressions;
//! the interesting payload is usually in FAIL `<msg>` and/or the FAIL
//! `<status>` element text.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use log::*;

use rfsift_core::filter::{KeywordFilter, OperatorFilter, TextFilters};
use rfsift_core::render::{self, RenderOptions};
use rfsift_core::scan::{self, ScanOptions};
use rfsift_core::ScanError;

#[derive(Parser)]
#[command(name = "rfsift")]
#[command(about = "Find useful FAIL message examples in a Robot Framework output.xml")]
#[command(long_about = None)]
#[command(after_help = r#"EXAMPLES:
    rfsift /path/to/output.xml
    rfsift /path/to/output.xml -k "Should Be Equal" --operator "!=" --jsonish
    rfsift /path/to/output.xml -k "Should Contain" --limit 50 --full
    rfsift /path/to/output.xml --keyword any --operator any --show-args
    rfsift /path/to/output.xml --no-kw --counts
"#)]
struct Args {
    /// Path to Robot Framework output.xml
    xml: PathBuf,

    /// Keyword name substring to match (case-insensitive). Use 'any' to
    /// match all keywords.
    #[arg(short, long, default_value = "Should Be Equal")]
    keyword: String,

    /// Only show messages containing this operator
    #[arg(long, value_enum, default_value = "!=")]
    operator: OperatorArg,

    /// Only show messages containing this substring
    #[arg(long, default_value = "")]
    contains: String,

    /// Only show messages that look like they contain JSON/arrays
    #[arg(long)]
    jsonish: bool,

    /// Maximum number of matches to print
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Print full FAIL message text (default prints a shortened preview)
    #[arg(long)]
    full: bool,

    /// Do not print the full matching <kw>...</kw> XML block
    #[arg(long = "no-kw", action = ArgAction::SetFalse)]
    kw: bool,

    /// Max characters to print for the <kw> XML block (use 0 for no limit)
    #[arg(long, default_value_t = 200_000)]
    kw_max_chars: usize,

    /// Also print the first few <arg> values for the keyword
    #[arg(long)]
    show_args: bool,

    /// Also print a pass/fail/total tally of the scanned test cases
    #[arg(long)]
    counts: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum OperatorArg {
    /// Messages containing "!="
    #[value(name = "!=")]
    NotEqual,
    /// Messages containing "=="
    #[value(name = "==")]
    Equal,
    /// Messages containing either operator
    Any,
}

impl From<OperatorArg> for OperatorFilter {
    fn from(arg: OperatorArg) -> Self {
        match arg {
            OperatorArg::NotEqual => Self::NotEqual,
            OperatorArg::Equal => Self::Equal,
            OperatorArg::Any => Self::Any,
        }
    }
}

fn build_options(args: &Args) -> ScanOptions {
    ScanOptions {
        keyword: KeywordFilter::new(&args.keyword),
        text: TextFilters {
            contains: if args.contains.is_empty() {
                None
            } else {
                Some(args.contains.clone())
            },
            operator: args.operator.into(),
            jsonish_only: args.jsonish,
        },
        limit: args.limit,
        render: RenderOptions {
            full_text: args.full,
            keyword_xml: args.kw,
            keyword_xml_max_chars: args.kw_max_chars,
            show_args: args.show_args,
        },
    }
}

fn run<W: Write>(args: &Args, out: &mut W) -> Result<(), ScanError> {
    let opts = build_options(args);
    debug!(
        "scanning {} (keyword={:?}, operator={}, limit={})",
        args.xml.display(),
        args.keyword,
        opts.text.operator,
        opts.limit
    );

    let outcome = scan::scan_report(&args.xml, &opts, out)?;
    render::write_summary(out, &outcome)?;
    if args.counts {
        render::write_tally(out, &outcome.tests)?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();
    let args = Args::parse();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = run(&args, &mut out);

    // Flush before exiting so matches printed ahead of a late parse
    // failure are not lost
    if let Err(e) = out.flush() {
        eprintln!("Cannot write output: {e}");
        std::process::exit(1);
    }

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(match e {
            ScanError::NotFound(_) | ScanError::Open { .. } => 2,
            ScanError::Malformed(_) => 3,
            ScanError::Output(_) => 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_documented_surface() {
        let args = Args::try_parse_from(["rfsift", "output.xml"]).unwrap();
        assert_eq!(args.xml, PathBuf::from("output.xml"));
        assert_eq!(args.keyword, "Should Be Equal");
        assert_eq!(args.operator, OperatorArg::NotEqual);
        assert_eq!(args.contains, "");
        assert!(!args.jsonish);
        assert_eq!(args.limit, 20);
        assert!(!args.full);
        assert!(args.kw);
        assert_eq!(args.kw_max_chars, 200_000);
        assert!(!args.show_args);
        assert!(!args.counts);
    }

    #[test]
    fn no_kw_flag_disables_subtree_printing() {
        let args = Args::try_parse_from(["rfsift", "output.xml", "--no-kw"]).unwrap();
        assert!(!args.kw);
        assert!(!build_options(&args).render.keyword_xml);
    }

    #[test]
    fn operator_spellings_parse() {
        for (value, expected) in [
            ("!=", OperatorArg::NotEqual),
            ("==", OperatorArg::Equal),
            ("any", OperatorArg::Any),
        ] {
            let args =
                Args::try_parse_from(["rfsift", "output.xml", "--operator", value]).unwrap();
            assert_eq!(args.operator, expected);
        }
        assert!(Args::try_parse_from(["rfsift", "output.xml", "--operator", ">="]).is_err());
    }

    #[test]
    fn missing_path_is_rejected() {
        assert!(Args::try_parse_from(["rfsift"]).is_err());
    }

    #[test]
    fn options_map_onto_core_types() {
        let args = Args::try_parse_from([
            "rfsift",
            "output.xml",
            "--keyword",
            "any",
            "--operator",
            "any",
            "--contains",
            "Error",
            "--jsonish",
            "--limit",
            "5",
            "--full",
            "--kw-max-chars",
            "0",
            "--show-args",
        ])
        .unwrap();
        let opts = build_options(&args);
        assert_eq!(opts.keyword, KeywordFilter::Any);
        assert_eq!(opts.text.operator, OperatorFilter::Any);
        assert_eq!(opts.text.contains.as_deref(), Some("Error"));
        assert!(opts.text.jsonish_only);
        assert_eq!(opts.limit, 5);
        assert!(opts.render.full_text);
        assert_eq!(opts.render.keyword_xml_max_chars, 0);
        assert!(opts.render.show_args);
    }

    #[test]
    fn empty_contains_disables_that_filter() {
        let args = Args::try_parse_from(["rfsift", "output.xml"]).unwrap();
        assert_eq!(build_options(&args).text.contains, None);
    }

    #[test]
    fn run_prints_tip_after_done_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.xml");
        std::fs::write(
            &path,
            r#"<robot><test name="T1">
                <kw name="Should Be Equal">
                  <msg level="FAIL">1 != 2</msg>
                  <status status="FAIL">1 != 2</status>
                </kw>
                <status status="FAIL"/>
              </test></robot>"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "rfsift",
            path.to_str().unwrap(),
            "--operator",
            "==",
            "--counts",
        ])
        .unwrap();
        let mut buf = Vec::new();
        run(&args, &mut buf).unwrap();

        let output = String::from_utf8(buf).unwrap();
        assert!(!output.contains("] test="));
        let done = output
            .find("Done. Found 0 matches. Searched FAIL keywords: 1.")
            .unwrap();
        let tip = output.find("Tip: try --operator any").unwrap();
        assert!(done < tip);
        assert!(output.ends_with("Tests: 0 pass, 1 fail, 1 total.\n"));
    }
}
