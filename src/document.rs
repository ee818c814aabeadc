//! Defines the [`Document`] type, the in-memory record for one source file,
//! along with its [`Status`]. A [`Document`] can be written back out as source
//! text via [`Document::to_source`].

use chrono::{DateTime, FixedOffset};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use url::{ParseError, Url};

/// The format used when writing a [`Document`]'s date back into a header
/// block. It keeps the offset and any fractional seconds so that re-parsing
/// yields the same instant in the same timezone.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// The publication status of a [`Document`]. Drafts are parsed like any other
/// document but are kept out of listings by [`crate::index::Site`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Published,
    Draft,
}

impl Default for Status {
    fn default() -> Self {
        Status::Published
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("published") {
            Ok(Status::Published)
        } else if s.eq_ignore_ascii_case("draft") {
            Ok(Status::Draft)
        } else {
            Err(s.to_owned())
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Published => write!(f, "published"),
            Status::Draft => write!(f, "draft"),
        }
    }
}

/// One parsed unit of content. Documents are immutable once loaded; nothing
/// in this crate mutates a [`Document`] after [`crate::frontmatter::parse`]
/// returns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// The title of the document. Never empty.
    pub title: String,

    /// The date of the document, used for ordering.
    pub date: DateTime<FixedOffset>,

    /// The document's single classification label, if any.
    pub category: Option<String>,

    /// The labels associated with the document. May be empty.
    pub tags: BTreeSet<String>,

    /// The URL-safe identifier of the document. Taken from the `Slug` header
    /// when present, otherwise derived from the title.
    pub slug: String,

    /// The author named in the `Author` header, if any.
    pub author: Option<String>,

    /// The summary named in the `Summary` header, if any.
    pub summary: Option<String>,

    pub status: Status,

    /// Everything after the header block, verbatim.
    pub body: String,
}

impl Document {
    pub fn is_draft(&self) -> bool {
        self.status == Status::Draft
    }

    /// Renders the document's metadata as a header block. Every line is a
    /// `Key: value` pair; optional fields are only written when present, and
    /// `Status` is only written for drafts.
    pub fn to_header(&self) -> String {
        let mut header = String::new();
        push_field(&mut header, "Title", &self.title);
        push_field(
            &mut header,
            "Date",
            &self.date.format(DATE_FORMAT).to_string(),
        );
        if let Some(category) = &self.category {
            push_field(&mut header, "Category", category);
        }
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            push_field(&mut header, "Tags", &tags.join(", "));
        }
        push_field(&mut header, "Slug", &self.slug);
        if let Some(author) = &self.author {
            push_field(&mut header, "Author", author);
        }
        if let Some(summary) = &self.summary {
            push_field(&mut header, "Summary", summary);
        }
        if self.is_draft() {
            push_field(&mut header, "Status", &self.status.to_string());
        }
        header
    }

    /// Renders the whole document (header block, blank separator line, and
    /// body) as source text.
    pub fn to_source(&self) -> String {
        format!("{}\n{}", self.to_header(), self.body)
    }

    /// Returns the document's URL relative to `site_url`, i.e.,
    /// `{site_url}/{slug}.html`. `site_url` should end in a trailing slash;
    /// otherwise its last path segment is replaced per [`Url::join`].
    pub fn url(&self, site_url: &Url) -> Result<Url, ParseError> {
        site_url.join(&format!("{}.html", self.slug))
    }
}

fn push_field(header: &mut String, key: &str, value: &str) {
    header.push_str(key);
    header.push_str(": ");
    header.push_str(value);
    header.push('\n');
}

/// Orders documents most recent first. Documents with the same date are
/// ordered by title so listings are stable across runs.
pub fn newest_first(a: &Document, b: &Document) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.title.cmp(&b.title))
}
