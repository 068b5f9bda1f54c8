//! Pull-based reader that yields one materialized `<test>` subtree at a
//! time. Only a single subtree is alive at any point, so memory stays
//! bounded no matter how large the report file is.
//!
//! Association rules mirror how the report format is consumed downstream:
//! `<kw>` elements are discovered at any depth, including inside wrapper
//! elements such as control structures, while `<msg>`/`<arg>`/`<status>`
//! only attach to the invocation they are a direct child of. Text is the
//! content before the first child element. Unknown elements and attributes
//! are skipped, not validated.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::report::{Keyword, Message, Status, TestCase};
use crate::ScanError;

const TAG_TEST: &[u8] = b"test";
const TAG_KW: &[u8] = b"kw";
const TAG_MSG: &[u8] = b"msg";
const TAG_ARG: &[u8] = b"arg";
const TAG_STATUS: &[u8] = b"status";

const ATTR_NAME: &[u8] = b"name";
const ATTR_LEVEL: &[u8] = b"level";
const ATTR_STATUS: &[u8] = b"status";

/// Streams `TestCase` subtrees out of a report document
pub struct TestCaseStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// Open elements outside any `<test>` subtree
    depth: usize,
    saw_element: bool,
    done: bool,
}

impl TestCaseStream<BufReader<File>> {
    /// Opens a report file. A missing path is reported as
    /// [`ScanError::NotFound`] without reading anything.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ScanError::NotFound(path.to_path_buf())
            } else {
                ScanError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

/// A recognized `<test>` element at the document level
enum FoundTest {
    WithBody(String),
    Empty(String),
}

/// An in-flight `msg`/`arg`/`status` whose text is being collected
struct Capture {
    kind: CaptureKind,
    text: String,
    /// Open child elements below the captured element
    child_depth: usize,
    /// Set once the first child element is seen; text after it is tail
    /// text of that child and does not belong to the captured element
    text_done: bool,
}

enum CaptureKind {
    Message { level: String },
    Argument,
    Status { outcome: String },
}

impl Capture {
    fn new(kind: CaptureKind) -> Self {
        Self {
            kind,
            text: String::new(),
            child_depth: 0,
            text_done: false,
        }
    }
}

impl<R: BufRead> TestCaseStream<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            depth: 0,
            saw_element: false,
            done: false,
        }
    }

    /// Reads forward to the next `<test>` element and materializes it.
    /// `Ok(None)` is a clean end of the document.
    fn next_test(&mut self) -> Result<Option<TestCase>, ScanError> {
        let found = loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => {
                    self.saw_element = true;
                    if e.name().as_ref() == TAG_TEST {
                        break FoundTest::WithBody(attr_string(&e, ATTR_NAME).unwrap_or_default());
                    }
                    self.depth += 1;
                }
                Ok(Event::Empty(e)) => {
                    self.saw_element = true;
                    if e.name().as_ref() == TAG_TEST {
                        break FoundTest::Empty(attr_string(&e, ATTR_NAME).unwrap_or_default());
                    }
                }
                Ok(Event::End(_)) => self.depth = self.depth.saturating_sub(1),
                Ok(Event::Eof) => {
                    return if self.depth > 0 {
                        Err(ScanError::Malformed(
                            "unexpected end of file: unclosed element".to_string(),
                        ))
                    } else if self.saw_element {
                        Ok(None)
                    } else {
                        Err(ScanError::Malformed("no element found".to_string()))
                    };
                }
                Ok(_) => (),
                Err(e) => return Err(ScanError::Malformed(e.to_string())),
            }
        };

        match found {
            FoundTest::WithBody(name) => Ok(Some(self.read_test_subtree(name)?)),
            FoundTest::Empty(name) => Ok(Some(TestCase {
                name,
                ..Default::default()
            })),
        }
    }

    /// Consumes events up to the matching `</test>` and builds the subtree
    fn read_test_subtree(&mut self, name: String) -> Result<TestCase, ScanError> {
        let mut test = TestCase {
            name,
            ..Default::default()
        };
        // Invocations under construction, innermost last, each with the
        // number of open unknown elements below it
        let mut kw_stack: Vec<(Keyword, usize)> = Vec::new();
        // Open unknown elements directly below <test>, outside any kw
        let mut unknown_depth: usize = 0;
        let mut capture: Option<Capture> = None;

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => {
                    if let Some(cap) = capture.as_mut() {
                        cap.child_depth += 1;
                        cap.text_done = true;
                    } else if e.name().as_ref() == TAG_KW {
                        let kw = Keyword {
                            name: attr_string(&e, ATTR_NAME).unwrap_or_default(),
                            ..Default::default()
                        };
                        kw_stack.push((kw, 0));
                    } else if let Some(kind) = capture_kind(
                        &e,
                        direct_under_kw(&kw_stack),
                        direct_under_test(&kw_stack, unknown_depth),
                    ) {
                        capture = Some(Capture::new(kind));
                    } else if let Some((_, open)) = kw_stack.last_mut() {
                        *open += 1;
                    } else {
                        unknown_depth += 1;
                    }
                }
                Ok(Event::Empty(e)) => {
                    if let Some(cap) = capture.as_mut() {
                        cap.text_done = true;
                    } else if e.name().as_ref() == TAG_KW {
                        let kw = Keyword {
                            name: attr_string(&e, ATTR_NAME).unwrap_or_default(),
                            ..Default::default()
                        };
                        attach_keyword(kw, &mut kw_stack, &mut test);
                    } else if let Some(kind) = capture_kind(
                        &e,
                        direct_under_kw(&kw_stack),
                        direct_under_test(&kw_stack, unknown_depth),
                    ) {
                        commit_capture(Capture::new(kind), &mut kw_stack, &mut test);
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(cap) = capture.as_mut() {
                        if !cap.text_done {
                            let text = t
                                .unescape()
                                .map_err(|e| ScanError::Malformed(e.to_string()))?;
                            cap.text.push_str(&text);
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(cap) = capture.as_mut() {
                        if !cap.text_done {
                            // Escape-then-unescape turns the CDATA section
                            // into plain text content
                            if let Ok(t) = e.minimal_escape() {
                                if let Ok(text) = t.unescape() {
                                    cap.text.push_str(&text);
                                }
                            }
                        }
                    }
                }
                Ok(Event::End(_)) => match capture.as_mut() {
                    Some(cap) if cap.child_depth > 0 => cap.child_depth -= 1,
                    Some(_) => {
                        if let Some(cap) = capture.take() {
                            commit_capture(cap, &mut kw_stack, &mut test);
                        }
                    }
                    None => {
                        if let Some((_, open)) = kw_stack.last_mut() {
                            if *open > 0 {
                                *open -= 1;
                                continue;
                            }
                        }
                        if let Some((kw, _)) = kw_stack.pop() {
                            attach_keyword(kw, &mut kw_stack, &mut test);
                        } else if unknown_depth > 0 {
                            unknown_depth -= 1;
                        } else {
                            return Ok(test);
                        }
                    }
                },
                Ok(Event::Eof) => {
                    return Err(ScanError::Malformed(
                        "unexpected end of file inside <test> element".to_string(),
                    ))
                }
                Ok(_) => (),
                Err(e) => return Err(ScanError::Malformed(e.to_string())),
            }
        }
    }
}

impl<R: BufRead> Iterator for TestCaseStream<R> {
    type Item = Result<TestCase, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_test() {
            Ok(Some(test)) => Some(Ok(test)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// True when the innermost open invocation has no unknown element open
/// below it, i.e. the current position is a direct child of that invocation
fn direct_under_kw(kw_stack: &[(Keyword, usize)]) -> bool {
    kw_stack.last().is_some_and(|(_, open)| *open == 0)
}

/// True when the current position is a direct child of `<test>` itself
fn direct_under_test(kw_stack: &[(Keyword, usize)], unknown_depth: usize) -> bool {
    kw_stack.is_empty() && unknown_depth == 0
}

/// Decides whether this element starts a text capture at the current
/// position. `msg`/`arg` attach to invocations only; `status` also attaches
/// directly to the test case.
fn capture_kind(e: &BytesStart, under_kw: bool, under_test: bool) -> Option<CaptureKind> {
    match e.name().as_ref() {
        TAG_MSG if under_kw => Some(CaptureKind::Message {
            level: attr_string(e, ATTR_LEVEL).unwrap_or_default(),
        }),
        TAG_ARG if under_kw => Some(CaptureKind::Argument),
        TAG_STATUS if under_kw || under_test => Some(CaptureKind::Status {
            outcome: attr_string(e, ATTR_STATUS).unwrap_or_default(),
        }),
        _ => None,
    }
}

/// Attaches a finished invocation to its parent, or to the test case when
/// it completed at the top of the stack
fn attach_keyword(kw: Keyword, kw_stack: &mut [(Keyword, usize)], test: &mut TestCase) {
    match kw_stack.last_mut() {
        Some((parent, _)) => parent.children.push(kw),
        None => test.keywords.push(kw),
    }
}

/// Commits a finished capture to the innermost invocation or the test case.
/// A repeated `status` keeps the first one seen.
fn commit_capture(cap: Capture, kw_stack: &mut [(Keyword, usize)], test: &mut TestCase) {
    let text = cap.text.trim().to_string();
    let target = kw_stack.last_mut().map(|(kw, _)| kw);
    match cap.kind {
        CaptureKind::Message { level } => {
            if let Some(kw) = target {
                kw.messages.push(Message { level, text });
            }
        }
        CaptureKind::Argument => {
            if let Some(kw) = target {
                kw.args.push(text);
            }
        }
        CaptureKind::Status { outcome } => {
            let slot = match target {
                Some(kw) => &mut kw.status,
                None => &mut test.status,
            };
            if slot.is_none() {
                *slot = Some(Status { outcome, text });
            }
        }
    }
}

fn attr_string(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}
