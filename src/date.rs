//! Defines the [`DateResolver`] which turns the free-form `created` header of
//! a post into a [`Timestamp`] by trying a fixed, ordered list of [`Layout`]s.

use std::time::SystemTime;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc,
};
use regex::Regex;

/// The timestamp type used for post creation times. Layouts without a zone
/// are read as UTC.
pub type Timestamp = DateTime<FixedOffset>;

/// A single date/time layout. The string payloads are [`chrono::format`]
/// strftime patterns; the input must be consumed entirely for a layout to
/// match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// RFC3339 with a `Z` or numeric offset, e.g. `2021-05-03T10:15:00+02:00`.
    Rfc3339,

    /// A date and a time of day without a zone.
    DateTime(&'static str),

    /// A calendar date only; the time is midnight.
    Date(&'static str),
}

impl Layout {
    /// Attempts to parse `raw` with this layout. chrono's numeric fields are
    /// lenient about width, so callers that need exact field widths should
    /// check `raw` against [`Layout::shape`] first (as [`DateResolver`]
    /// does).
    pub fn parse(&self, raw: &str) -> Option<Timestamp> {
        match self {
            Layout::Rfc3339 => DateTime::parse_from_rfc3339(raw).ok(),
            Layout::DateTime(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
                .ok()
                .map(from_naive),
            Layout::Date(fmt) => NaiveDate::parse_from_str(raw, fmt)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(from_naive),
        }
    }

    /// Returns an anchored regular expression for the text this layout
    /// accepts: `%Y` is exactly four digits, `%m`, `%d`, `%M` and `%S` are
    /// exactly two, and `%-m`, `%-d` and `%H` are one or two. Everything
    /// else in the format must appear literally. [`Layout::Rfc3339`] has no
    /// shape; chrono already parses it with fixed widths.
    pub fn shape(&self) -> Option<String> {
        let fmt = match self {
            Layout::Rfc3339 => return None,
            Layout::DateTime(fmt) | Layout::Date(fmt) => fmt,
        };

        let mut pattern = String::from("^");
        let mut chars = fmt.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                pattern.push_str(&regex::escape(&c.to_string()));
                continue;
            }
            let field = match chars.next() {
                Some('-') => chars.next().map(|c| (c, false)),
                other => other.map(|c| (c, true)),
            };
            pattern.push_str(match field {
                Some(('Y', _)) => "[0-9]{4}",
                Some(('m', true)) | Some(('d', true)) => "[0-9]{2}",
                Some(('M', _)) | Some(('S', _)) => "[0-9]{2}",
                Some(('m', false)) | Some(('d', false)) => "[0-9]{1,2}",
                Some(('H', _)) => "[0-9]{1,2}",
                _ => ".+",
            });
        }
        pattern.push('$');
        Some(pattern)
    }
}

fn from_naive(naive: NaiveDateTime) -> Timestamp {
    Utc.from_utc_datetime(&naive).into()
}

/// Converts a filesystem modification time into a [`Timestamp`].
pub fn from_system_time(time: SystemTime) -> Timestamp {
    DateTime::<Utc>::from(time).into()
}

/// The layouts tried by [`DateResolver::default`], most specific first.
pub const DEFAULT_LAYOUTS: &[Layout] = &[
    Layout::Rfc3339,
    Layout::DateTime("%Y-%m-%dT%H:%M:%S"),
    Layout::DateTime("%Y-%m-%d %H:%M:%S"),
    Layout::DateTime("%Y-%m-%dT%H:%M"),
    Layout::DateTime("%d.%m.%Y %H:%M:%S"),
    Layout::DateTime("%-d.%-m.%Y %H:%M:%S"),
    Layout::DateTime("%d.%m.%Y %H:%M"),
    Layout::DateTime("%-d.%-m.%Y %H:%M"),
    Layout::DateTime("%Y-%m-%d %H:%M"),
    Layout::Date("%Y-%m-%d"),
    Layout::Date("%d.%m.%Y"),
    Layout::Date("%-d.%-m.%Y"),
];

/// Resolves date strings against an ordered list of [`Layout`]s. Built once
/// per build and shared read-only by every parse.
#[derive(Clone, Debug)]
pub struct DateResolver {
    layouts: Vec<(Layout, Option<Regex>)>,
}

impl Default for DateResolver {
    fn default() -> Self {
        DateResolver::new(DEFAULT_LAYOUTS.to_vec())
    }
}

impl DateResolver {
    /// Constructs a resolver which tries `layouts` in the given order. Each
    /// layout's [`Layout::shape`] is compiled here.
    pub fn new(layouts: Vec<Layout>) -> DateResolver {
        let layouts = layouts
            .into_iter()
            .map(|layout| {
                // shapes are escaped literals and fixed digit classes
                let shape = layout
                    .shape()
                    .map(|pattern| Regex::new(&pattern).unwrap());
                (layout, shape)
            })
            .collect();
        DateResolver { layouts }
    }

    /// Returns the timestamp produced by the first layout that matches all of
    /// `raw` (surrounding whitespace is ignored), or `None` if none does.
    pub fn resolve(&self, raw: &str) -> Option<Timestamp> {
        let raw = raw.trim();
        self.layouts
            .iter()
            .filter(|(_, shape)| match shape {
                Some(shape) => shape.is_match(raw),
                None => true,
            })
            .find_map(|(layout, _)| layout.parse(raw))
    }
}
