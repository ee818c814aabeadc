//! Parses a [`Document`] from source text. A source file begins with a block
//! of `Key: value` header lines; the block ends at the first blank line, and
//! everything after that line is the body:
//!
//! ```text
//! Title: OCaml tutorial, part 1
//! Date: 2018-08-14
//! Category: programming
//! Tags: ocaml, tutorials
//!
//! Body text, in whatever markup the author prefers.
//! ```
//!
//! Keys are matched case-sensitively. `Title` and `Date` are required;
//! `Category`, `Tags`, `Slug`, `Author`, `Summary`, and `Status` are optional.
//! Any other key is ignored.

use crate::document::{Document, Status, DATE_FORMAT};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Date formats that carry their own UTC offset. RFC 3339 is tried first.
const OFFSET_FORMATS: &[&str] = &[DATE_FORMAT, "%Y-%m-%d %H:%M:%S %:z", "%Y-%m-%d %H:%M%:z"];

/// Date-time formats without an offset; these are interpreted in the default
/// offset passed to [`parse`].
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Calendar-date formats; these are taken as midnight in the default offset.
const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses `input` into a [`Document`]. Dates without an explicit offset are
/// interpreted in `default_offset`.
pub fn parse(input: &str, default_offset: &FixedOffset) -> Result<Document> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let (fields, body) = split(input);

    let mut title = None;
    let mut date = None;
    let mut category = None;
    let mut tags = BTreeSet::new();
    let mut slug = None;
    let mut author = None;
    let mut summary = None;
    let mut status = None;

    // Later occurrences of a key replace earlier ones.
    for field in &fields {
        match field.key {
            "Title" => title = field.value(),
            "Date" => date = field.value(),
            "Category" => category = field.value(),
            "Tags" => tags = field.list(),
            "Slug" => slug = field.value(),
            "Author" => author = field.value(),
            "Summary" => summary = field.value(),
            "Status" => status = field.value(),
            _ => {}
        }
    }

    let title = title.ok_or(Reason::MissingTitle)?;
    let date = date.ok_or(Reason::MissingDate)?;
    let date = parse_date(&date, default_offset).ok_or(Reason::InvalidDate(date))?;
    let status = match status {
        None => Status::default(),
        Some(s) => s.parse().map_err(Reason::InvalidStatus)?,
    };

    Ok(Document {
        slug: slug.unwrap_or_else(|| slug::slugify(&title)),
        title,
        date,
        category,
        tags,
        author,
        summary,
        status,
        body: body.to_owned(),
    })
}

/// Parses a header `Date` value. Returns [`None`] if `s` matches none of the
/// accepted formats or names a time that doesn't exist.
pub fn parse_date(s: &str, default_offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date);
    }
    for format in OFFSET_FORMATS {
        if let Ok(date) = DateTime::parse_from_str(s, format) {
            return Some(date);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return default_offset.from_local_datetime(&naive).single();
        }
    }
    for format in DATE_ONLY_FORMATS {
        if let Ok(naive) = NaiveDate::parse_from_str(s, format) {
            return default_offset
                .from_local_datetime(&naive.and_hms_opt(0, 0, 0)?)
                .single();
        }
    }
    None
}

impl FromStr for Document {
    type Err = MalformedDocument;

    /// Parses a [`Document`], interpreting offset-less dates as UTC.
    fn from_str(s: &str) -> Result<Self> {
        parse(s, &Utc.fix())
    }
}

/// A header key along with the lines of its value. A value spans more than
/// one line when it's followed by indented continuation lines.
struct Field<'a> {
    key: &'a str,
    lines: Vec<&'a str>,
}

impl Field<'_> {
    /// Joins the value's lines with single spaces. Empty values are [`None`].
    fn value(&self) -> Option<String> {
        let lines: Vec<&str> = self.lines.iter().copied().filter(|l| !l.is_empty()).collect();
        match lines.is_empty() {
            true => None,
            false => Some(lines.join(" ")),
        }
    }

    /// Splits the value on commas, dropping empty elements.
    fn list(&self) -> BTreeSet<String> {
        self.lines
            .iter()
            .flat_map(|line| line.split(','))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// Splits `input` into its header fields and its body. The header block ends
/// at the first blank line, which belongs to neither part, or at the first
/// line that is neither a header line nor a continuation, which starts the
/// body.
fn split(input: &str) -> (Vec<Field<'_>>, &str) {
    let mut fields: Vec<Field> = Vec::new();
    let mut offset = 0;

    for line in input.split_inclusive('\n') {
        let text = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
        if text.trim().is_empty() {
            return (fields, &input[offset + line.len()..]);
        }

        if is_continuation(text) && !fields.is_empty() {
            let last = fields.len() - 1;
            fields[last].lines.push(text.trim());
        } else if let Some((key, value)) = header_line(text) {
            fields.push(Field {
                key,
                lines: vec![value.trim()],
            });
        } else {
            return (fields, &input[offset..]);
        }
        offset += line.len();
    }

    (fields, "")
}

fn is_continuation(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

fn header_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    match valid {
        true => Some((key, value)),
        false => None,
    }
}

/// Represents the result of a [`Document`]-parse operation.
pub type Result<T> = std::result::Result<T, MalformedDocument>;

/// Returned when a document's required metadata is missing or can't be
/// parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedDocument {
    pub reason: Reason,
}

/// Why a document was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reason {
    /// The header has no `Title`, or its value is empty.
    MissingTitle,

    /// The header has no `Date`, or its value is empty.
    MissingDate,

    /// The `Date` value isn't a calendar date or date-time in any accepted
    /// format.
    InvalidDate(String),

    /// The `Status` value is neither `published` nor `draft`.
    InvalidStatus(String),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reason::MissingTitle => write!(f, "missing `Title`"),
            Reason::MissingDate => write!(f, "missing `Date`"),
            Reason::InvalidDate(date) => write!(f, "invalid `Date`: `{}`", date),
            Reason::InvalidStatus(status) => {
                write!(f, "invalid `Status`: `{}`", status)
            }
        }
    }
}

impl fmt::Display for MalformedDocument {
    /// Displays a [`MalformedDocument`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed document: {}", self.reason)
    }
}

impl std::error::Error for MalformedDocument {}

impl From<Reason> for MalformedDocument {
    /// Wraps a [`Reason`] so the `?` operator can be used on it.
    fn from(reason: Reason) -> MalformedDocument {
        MalformedDocument { reason }
    }
}
