//! Defines the [`PostParser`], which splits a post source stream into a
//! header block and a body. The parser scans line by line through a small
//! state machine ([`State`]); each state has a transition function returning
//! a [`Transition`] so that every rule can be exercised on its own.
//!
//! A post may begin with a header block:
//!
//! ```text
//! ---
//! Title: Hello, world!
//! Created: 2021-04-16 09:30
//! Author: Jane
//! ---
//! Body text...
//! ```
//!
//! The title comes from the `title` header if there is one, and otherwise from
//! the first Markdown heading in the body.

use std::{
    collections::HashMap,
    io::{self, BufRead},
};

use regex::Regex;

use crate::date::{DateResolver, Timestamp};

/// The compiled line patterns recognized by the parser. Built once and shared
/// read-only between parses.
#[derive(Clone, Debug)]
pub struct Grammar {
    separator: Regex,
    header: Regex,
    heading: Regex,
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::new()
    }
}

impl Grammar {
    pub fn new() -> Grammar {
        // the patterns are literals; failing to compile them is a bug
        Grammar {
            separator: Regex::new(r"^\s*[-*]{3,}\s*$").unwrap(),
            header: Regex::new(r"^\s*([0-9A-Za-z_]+):\s*(.+)$").unwrap(),
            heading: Regex::new(r"^#{1,8} (.+)$").unwrap(),
        }
    }

    /// Returns true if `line` is a header block separator (`---`, `***`, ...).
    pub fn is_separator(&self, line: &str) -> bool {
        self.separator.is_match(strip_terminator(line))
    }

    /// Splits a `key: value` header line into its lower-cased key and trimmed
    /// value.
    pub fn header(&self, line: &str) -> Option<(String, String)> {
        self.header.captures(strip_terminator(line)).map(|caps| {
            (caps[1].to_lowercase(), caps[2].trim().to_owned())
        })
    }

    /// Returns the trimmed text of an ATX heading (`#` through `########`).
    pub fn heading<'l>(&self, line: &'l str) -> Option<&'l str> {
        self.heading
            .captures(strip_terminator(line))
            .and_then(|caps| caps.get(1))
            .map(|text| text.as_str().trim())
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// The scanner states. [`State::Done`] is entered once a title is known and
/// another body line has been seen; nothing past that point is inspected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Start,
    Header,
    Body,
    Done,
}

/// The side effect of consuming a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to record.
    Skip,

    /// Buffer the line as a raw header line.
    Buffer,

    /// Commit the buffered header lines. The body begins after this line.
    Commit,

    /// Drop the buffered header lines and reconsider the same line as body
    /// content.
    Reject,

    /// Use the heading text as the title.
    Title(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: State,
    pub effect: Effect,
}

impl Transition {
    fn new(next: State, effect: Effect) -> Transition {
        Transition { next, effect }
    }
}

impl State {
    /// Computes the transition for `line` in this state. `has_title` reports
    /// whether a title has been found yet.
    pub fn transition(
        self,
        grammar: &Grammar,
        line: &str,
        has_title: bool,
    ) -> Transition {
        match self {
            State::Start => on_start(grammar, line),
            State::Header => on_header(grammar, line),
            State::Body => on_body(grammar, line, has_title),
            State::Done => Transition::new(State::Done, Effect::Skip),
        }
    }
}

fn on_start(grammar: &Grammar, line: &str) -> Transition {
    if grammar.is_separator(line) {
        return Transition::new(State::Header, Effect::Skip);
    }
    match grammar.heading(line) {
        Some(title) => title_found(title),
        None => Transition::new(State::Start, Effect::Skip),
    }
}

fn on_header(grammar: &Grammar, line: &str) -> Transition {
    if grammar.header(line).is_some() {
        Transition::new(State::Header, Effect::Buffer)
    } else if grammar.is_separator(line) {
        Transition::new(State::Body, Effect::Commit)
    } else {
        Transition::new(State::Body, Effect::Reject)
    }
}

fn on_body(grammar: &Grammar, line: &str, has_title: bool) -> Transition {
    if has_title {
        return Transition::new(State::Done, Effect::Skip);
    }
    match grammar.heading(line) {
        Some(title) => title_found(title),
        None => Transition::new(State::Body, Effect::Skip),
    }
}

fn title_found(title: &str) -> Transition {
    Transition::new(State::Body, Effect::Title(title.to_owned()))
}

/// The fields extracted from a post source stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parsed {
    /// Header values keyed by lower-cased header name.
    pub headers: HashMap<String, String>,

    /// The `title` header, or else the first Markdown heading. Empty if
    /// neither was found.
    pub title: String,

    /// The `author` header, if any.
    pub author: Option<String>,

    /// The `created` header resolved by the [`DateResolver`]. `None` if the
    /// header is absent or matches no layout.
    pub created: Option<Timestamp>,

    /// Byte offset at which the body begins; zero unless a complete header
    /// block was consumed.
    pub body_offset: usize,
}

/// Accumulates a [`Parsed`] value while the lines of a stream are fed to it.
struct Scan<'g> {
    grammar: &'g Grammar,
    state: State,
    buffer: Vec<String>,
    parsed: Parsed,
}

impl<'g> Scan<'g> {
    fn new(grammar: &'g Grammar) -> Scan<'g> {
        Scan {
            grammar,
            state: State::Start,
            buffer: Vec::new(),
            parsed: Parsed::default(),
        }
    }

    /// Consumes one line ending at byte offset `end`. Returns false once
    /// scanning should stop.
    fn step(&mut self, line: &str, end: usize) -> bool {
        loop {
            let has_title = !self.parsed.title.is_empty();
            let transition =
                self.state.transition(self.grammar, line, has_title);
            self.state = transition.next;
            match transition.effect {
                Effect::Skip => {}
                Effect::Buffer => self.buffer.push(line.to_owned()),
                Effect::Commit => self.commit(end),
                Effect::Reject => {
                    self.buffer.clear();
                    self.parsed.body_offset = 0;
                    continue;
                }
                Effect::Title(title) => self.parsed.title = title,
            }
            return self.state != State::Done;
        }
    }

    fn commit(&mut self, end: usize) {
        for line in self.buffer.drain(..) {
            if let Some((key, value)) = self.grammar.header(&line) {
                self.parsed.headers.insert(key, value);
            }
        }
        if let Some(title) = self.parsed.headers.get("title") {
            self.parsed.title = title.trim().to_owned();
        }
        self.parsed.body_offset = end;
    }

    fn finish(mut self, dates: &DateResolver) -> Parsed {
        self.parsed.created = self
            .parsed
            .headers
            .get("created")
            .and_then(|raw| dates.resolve(raw));
        self.parsed.author = self.parsed.headers.get("author").cloned();
        self.parsed
    }
}

/// Parses post source streams. Holds the [`Grammar`] and [`DateResolver`]
/// shared by every parse; a single parser may be used from many threads at
/// once.
#[derive(Clone, Debug, Default)]
pub struct PostParser {
    grammar: Grammar,
    dates: DateResolver,
}

impl PostParser {
    pub fn new(grammar: Grammar, dates: DateResolver) -> PostParser {
        PostParser { grammar, dates }
    }

    /// Scans `reader` for a header block and a title. Reading stops once the
    /// title is known and one further line has been seen, or at end of input.
    ///
    /// A read or UTF-8 decode failure aborts the scan with
    /// [`Error::Interrupted`], which carries whatever was parsed before the
    /// failure.
    pub fn parse<R: BufRead>(&self, mut reader: R) -> Result<Parsed> {
        let mut scan = Scan::new(&self.grammar);
        let mut offset = 0;
        let mut raw = Vec::new();
        loop {
            raw.clear();
            let read = match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) => {
                    return Err(scan.interrupted(offset, &self.dates, err))
                }
            };
            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line,
                Err(err) => {
                    let err = io::Error::new(io::ErrorKind::InvalidData, err);
                    return Err(scan.interrupted(offset, &self.dates, err));
                }
            };
            offset += read;
            if !scan.step(line, offset) {
                break;
            }
        }
        Ok(scan.finish(&self.dates))
    }
}

impl Scan<'_> {
    fn interrupted(
        self,
        offset: usize,
        dates: &DateResolver,
        source: io::Error,
    ) -> Error {
        Error::Interrupted {
            offset,
            partial: Box::new(self.finish(dates)),
            source,
        }
    }
}

/// Represents the result of a parse.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a post stream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the stream fails to read or decode partway through. The
    /// fields parsed before byte `offset` are kept in `partial`.
    #[error("reading post stream at byte {offset}: {source}")]
    Interrupted {
        offset: usize,
        partial: Box<Parsed>,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::{Cursor, Read};

    fn parse(input: &str) -> Parsed {
        PostParser::default()
            .parse(Cursor::new(input.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_header_block() {
        let input = "---\nTitle: Hello, world!\nAuthor: Jane Doe\n\
                     Created: 2021-05-03\n---\nBody\n";
        let parsed = parse(input);
        assert_eq!(parsed.title, "Hello, world!");
        assert_eq!(parsed.author.as_deref(), Some("Jane Doe"));
        assert_eq!(parsed.headers.len(), 3);
        assert_eq!(parsed.headers["created"], "2021-05-03");
        assert_eq!(&input[parsed.body_offset..], "Body\n");
        assert_eq!(
            parsed.created.map(|ts| ts.date_naive().to_string()).as_deref(),
            Some("2021-05-03")
        );
    }

    #[test]
    fn test_body_offset_follows_closing_separator() {
        for (input, body) in [
            ("---\na: 1\n---\nbody", "body"),
            ("***\na: 1\nb: 2\n*****\n\nbody\n", "\nbody\n"),
            (" --- \nkey:value\n ---\r\nbody\r\n", "body\r\n"),
            ("---\na: 1\n---", ""),
        ]
        .iter()
        {
            let parsed = parse(input);
            let rest = &input[parsed.body_offset..];
            assert_eq!(rest, *body, "input: {:?}", input);
        }
    }

    #[test]
    fn test_no_separator() {
        let parsed =
            parse("Just some text\nTitle: not a header\n\nmore text\n");
        assert_eq!(parsed.body_offset, 0);
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.title, "");
        assert_eq!(parsed.author, None);
    }

    #[test]
    fn test_heading_title_without_header() {
        let parsed = parse("intro\n## A Heading  \nbody\n# Another\n");
        assert_eq!(parsed.title, "A Heading");
        assert_eq!(parsed.body_offset, 0);
    }

    #[test]
    fn test_empty_header_block() {
        let input = "---\n---\n# Title\n";
        let parsed = parse(input);
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.body_offset, 8);
        assert_eq!(parsed.title, "Title");
    }

    #[test]
    fn test_title_header_wins_over_heading() {
        let parsed = parse("---\ntitle:  From Header \n---\n# From Heading\n");
        assert_eq!(parsed.title, "From Header");
    }

    #[test]
    fn test_duplicate_headers_last_wins() {
        let parsed = parse("---\nTag: one\ntag: two\n---\n");
        assert_eq!(parsed.headers.len(), 1);
        assert_eq!(parsed.headers["tag"], "two");
    }

    #[test]
    fn test_malformed_header_is_discarded() {
        let parsed = parse(
            "---\nauthor: Jane\nthis is not a header\n---\n# Heading\n",
        );
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.author, None);
        assert_eq!(parsed.body_offset, 0);
        assert_eq!(parsed.title, "Heading");
    }

    #[test]
    fn test_malformed_header_line_is_scanned_for_title() {
        let parsed = parse("---\nauthor: Jane\n# Heading\n---\n");
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.title, "Heading");
        assert_eq!(parsed.body_offset, 0);
    }

    #[test]
    fn test_unterminated_header_block() {
        let parsed = parse("---\ntitle: Never closed\n");
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.title, "");
        assert_eq!(parsed.body_offset, 0);
    }

    #[test]
    fn test_separator_after_body_text_does_not_reopen_header() {
        let parsed = parse("# Title\n---\na: b\n---\n");
        assert_eq!(parsed.title, "Title");
        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.body_offset, 0);
    }

    #[test]
    fn test_unresolved_created_header() {
        let parsed = parse("---\ncreated: someday\n---\n");
        assert_eq!(parsed.headers["created"], "someday");
        assert_eq!(parsed.created, None);
    }

    #[test]
    fn test_reparse_is_identical() {
        let input = "---\nTitle: Same\nCreated: 03.05.2021 10:15\n---\n\
                     # Ignored\nbody\n";
        assert_eq!(parse(input), parse(input));
    }

    #[test]
    fn test_stops_after_title() {
        // invalid UTF-8 after the title line must never be read
        let mut input = b"# Title\nsecond line\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let parsed = PostParser::default().parse(Cursor::new(input)).unwrap();
        assert_eq!(parsed.title, "Title");
    }

    #[test]
    fn test_decode_failure_is_interrupted() {
        let mut input = b"---\nauthor: Jane\n".to_vec();
        input.extend_from_slice(&[0xff, b'\n']);
        match PostParser::default().parse(Cursor::new(input)) {
            Err(Error::Interrupted { offset, source, .. }) => {
                assert_eq!(offset, 17);
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("expected interrupted parse, got {:?}", other),
        }
    }

    struct FailAfter {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::Other, "disk on fire")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_read_failure_keeps_partial_fields() {
        let reader = io::BufReader::new(FailAfter {
            data: Cursor::new(
                b"---\nauthor: Partial\n---\nno heading here\n".to_vec(),
            ),
        });
        match PostParser::default().parse(reader) {
            Err(Error::Interrupted {
                offset, partial, ..
            }) => {
                assert_eq!(offset, 40);
                assert_eq!(partial.author.as_deref(), Some("Partial"));
                assert_eq!(partial.title, "");
                assert_eq!(partial.body_offset, 24);
            }
            other => panic!("expected interrupted parse, got {:?}", other),
        }
    }

    #[test]
    fn test_transitions() {
        let g = Grammar::new();
        assert_eq!(
            State::Start.transition(&g, "---\n", false),
            Transition::new(State::Header, Effect::Skip)
        );
        assert_eq!(
            State::Start.transition(&g, "plain\n", false),
            Transition::new(State::Start, Effect::Skip)
        );
        assert_eq!(
            State::Start.transition(&g, "# Hi\n", false),
            Transition::new(State::Body, Effect::Title("Hi".to_owned()))
        );
        assert_eq!(
            State::Header.transition(&g, "key: value\n", false),
            Transition::new(State::Header, Effect::Buffer)
        );
        assert_eq!(
            State::Header.transition(&g, "***\n", false),
            Transition::new(State::Body, Effect::Commit)
        );
        assert_eq!(
            State::Header.transition(&g, "key:\n", false),
            Transition::new(State::Body, Effect::Reject)
        );
        assert_eq!(
            State::Body.transition(&g, "# Late\n", false),
            Transition::new(State::Body, Effect::Title("Late".to_owned()))
        );
        assert_eq!(
            State::Body.transition(&g, "# Late\n", true),
            Transition::new(State::Done, Effect::Skip)
        );
    }

    #[test]
    fn test_grammar() {
        let g = Grammar::new();
        assert!(g.is_separator("---"));
        assert!(g.is_separator("  ****  \r\n"));
        assert!(g.is_separator("-*-*\n"));
        assert!(!g.is_separator("--\n"));
        assert!(!g.is_separator("--- x\n"));
        assert_eq!(
            g.header(" Created:2021-05-03 \n"),
            Some(("created".to_owned(), "2021-05-03".to_owned()))
        );
        assert_eq!(
            g.header("url: http://example.com/a:b"),
            Some(("url".to_owned(), "http://example.com/a:b".to_owned()))
        );
        assert_eq!(g.header("two words: value"), None);
        assert_eq!(g.heading("######## Eight\n"), Some("Eight"));
        assert_eq!(g.heading("######### Nine\n"), None);
        assert_eq!(g.heading("#NoSpace\n"), None);
    }
}
