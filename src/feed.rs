//! Support for creating Atom feeds from document metadata. Bodies are never
//! rendered into the feed; each entry carries the document's title, link,
//! dates, summary, and labels.

use crate::document::Document;
use crate::index::Site;
use atom_syndication::{Category, Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use url::{ParseError, Url};

/// Bundled configuration for creating feeds.
pub struct FeedConfig<'a> {
    /// The site name, used as the feed title.
    pub title: String,

    /// The base URL for document links. Should end in a trailing slash.
    pub site_url: &'a Url,

    /// The author for documents without an `Author` header.
    pub author: Option<String>,
}

/// Creates a feed titled `title` with ID `id` from a list of documents and
/// writes the result to a [`std::io::Write`]. Entries appear in the order
/// given.
pub fn write_feed<W: Write>(
    config: &FeedConfig,
    title: &str,
    id: &Url,
    documents: &[&Document],
    w: W,
) -> Result<()> {
    feed(config, title, id, documents)?.write_to(w)?;
    Ok(())
}

/// Writes the feed of every published document to `all_path` and one feed
/// per category to `category_pattern` with `%s` replaced by the category's
/// slug. Either may be [`None`] to skip it. Both paths are relative to
/// `output_directory`. Returns the paths written. Fails with
/// [`Error::SlugCollision`] before writing anything if two categories share a
/// slug.
pub fn write_feeds(
    config: &FeedConfig,
    site: &Site,
    output_directory: &Path,
    all_path: Option<&Path>,
    category_pattern: Option<&str>,
) -> Result<Vec<PathBuf>> {
    if category_pattern.is_some() {
        check_category_slugs(site)?;
    }

    let mut written = Vec::new();

    if let Some(all_path) = all_path {
        let path = output_directory.join(all_path);
        write_feed(
            config,
            &config.title,
            config.site_url,
            site.listing().documents(),
            create(&path)?,
        )?;
        written.push(path);
    }

    if let Some(pattern) = category_pattern {
        for (name, listing) in site.categories() {
            let slug = slug::slugify(name);
            let path = output_directory.join(pattern.replace("%s", &slug));
            let id = config.site_url.join(&format!("category/{}.html", slug))?;
            write_feed(
                config,
                &format!("{} - {}", config.title, name),
                &id,
                listing.documents(),
                create(&path)?,
            )?;
            written.push(path);
        }
    }

    debug!("Wrote {} feeds", written.len());
    Ok(written)
}

// Category feeds are named by slug, so two categories with the same slug
// would write to the same file.
fn check_category_slugs(site: &Site) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (name, _) in site.categories() {
        let slug = slug::slugify(name);
        if let Some(first) = seen.get(&slug) {
            return Err(Error::SlugCollision {
                slug,
                first: (*first).to_owned(),
                second: name.to_owned(),
            });
        }
        seen.insert(slug, name);
    }
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(File::create(path)?)
}

fn feed(config: &FeedConfig, title: &str, id: &Url, documents: &[&Document]) -> Result<Feed> {
    let updated: DateTime<FixedOffset> = match documents.iter().map(|d| d.date).max() {
        Some(date) => date,
        None => Utc::now().with_timezone(&Utc.fix()),
    };

    let mut link = Link::default();
    link.set_href(id.to_string());
    link.set_rel("alternate");

    let mut feed = Feed::default();
    feed.set_title(Text::plain(title));
    feed.set_id(id.to_string());
    feed.set_updated(updated);
    feed.set_authors(author_to_people(config.author.as_deref()));
    feed.set_links(vec![link]);
    feed.set_entries(
        documents
            .iter()
            .map(|document| entry(config, document))
            .collect::<Result<Vec<Entry>>>()?,
    );
    Ok(feed)
}

fn entry(config: &FeedConfig, document: &Document) -> Result<Entry> {
    let url = document.url(config.site_url)?;

    let mut link = Link::default();
    link.set_href(url.to_string());
    link.set_rel("alternate");

    let categories: Vec<Category> = document
        .category
        .iter()
        .chain(document.tags.iter())
        .map(|term| {
            let mut category = Category::default();
            category.set_term(term.clone());
            category
        })
        .collect();

    let mut entry = Entry::default();
    entry.set_id(url.to_string());
    entry.set_title(Text::plain(document.title.clone()));
    entry.set_updated(document.date);
    entry.set_published(Some(document.date));
    entry.set_authors(author_to_people(
        document.author.as_deref().or(config.author.as_deref()),
    ));
    entry.set_links(vec![link]);
    entry.set_categories(categories);
    entry.set_summary(document.summary.clone().map(Text::plain));
    Ok(entry)
}

fn author_to_people(author: Option<&str>) -> Vec<Person> {
    match author {
        Some(name) => {
            let mut person = Person::default();
            person.set_name(name);
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O, Atom, and URL
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when a document or category URL can't be built.
    UrlParse(ParseError),

    /// Returned when two categories slugify to the same feed file name.
    SlugCollision {
        slug: String,
        first: String,
        second: String,
    },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::SlugCollision {
                slug,
                first,
                second,
            } => write!(
                f,
                "Categories `{}` and `{}` share the slug `{}`",
                first, second, slug
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::SlugCollision { .. } => None,
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn site() -> Site {
        let sources = vec![
            "Title: On blogging tools\nDate: 2018-02-20\nCategory: misc\n\nbody",
            "Title: OCaml tutorial\nDate: 2018-08-14\nCategory: programming\n\
             Tags: ocaml\nSummary: Getting started.\nAuthor: Someone Else\n\nbody",
        ];
        Site::new(sources.into_iter().map(|s| s.parse::<Document>().unwrap()).collect())
    }

    #[test]
    fn test_write_feed() -> Result<()> {
        let site_url = Url::parse("https://blog.example.org/")?;
        let config = FeedConfig {
            title: String::from("Example blog"),
            site_url: &site_url,
            author: Some(String::from("Daniil Baturin")),
        };
        let site = site();

        let mut buf: Vec<u8> = Vec::new();
        write_feed(&config, &config.title, &site_url, site.listing().documents(), &mut buf)?;
        let xml = String::from_utf8(buf).unwrap();

        assert!(xml.contains("Example blog"));
        assert!(xml.contains("https://blog.example.org/ocaml-tutorial.html"));
        assert!(xml.contains("https://blog.example.org/on-blogging-tools.html"));
        assert!(xml.contains("term=\"ocaml\""));
        assert!(xml.contains("term=\"programming\""));
        assert!(xml.contains("Getting started."));
        assert!(xml.contains("Someone Else"));
        assert!(xml.contains("Daniil Baturin"));

        let newer = xml.find("OCaml tutorial").unwrap();
        let older = xml.find("On blogging tools").unwrap();
        assert!(newer < older);
        Ok(())
    }

    #[test]
    fn test_write_feeds() -> Result<()> {
        let output = tempfile::tempdir()?;
        let site_url = Url::parse("https://blog.example.org/")?;
        let config = FeedConfig {
            title: String::from("Example blog"),
            site_url: &site_url,
            author: None,
        };

        let written = write_feeds(
            &config,
            &site(),
            output.path(),
            Some(Path::new("feeds/atom.xml")),
            Some("feeds/%s.atom.xml"),
        )?;

        let wanted: Vec<PathBuf> = vec![
            output.path().join("feeds/atom.xml"),
            output.path().join("feeds/misc.atom.xml"),
            output.path().join("feeds/programming.atom.xml"),
        ];
        assert_eq!(wanted, written);
        for path in &wanted {
            assert!(path.is_file(), "missing {}", path.display());
        }

        let programming = std::fs::read_to_string(&wanted[2])?;
        assert!(programming.contains("OCaml tutorial"));
        assert!(!programming.contains("On blogging tools"));
        Ok(())
    }

    #[test]
    fn test_feed_updated_is_latest_date() -> Result<()> {
        let site_url = Url::parse("https://blog.example.org/")?;
        let config = FeedConfig {
            title: String::from("Example blog"),
            site_url: &site_url,
            author: None,
        };
        let older: Document = "Title: Older\nDate: 2018-02-20\n\n".parse().unwrap();
        let newer: Document = "Title: Newer\nDate: 2018-08-14\n\n".parse().unwrap();

        let feed = feed(&config, "Example blog", &site_url, &[&older, &newer])?;
        assert_eq!(newer.date, *feed.updated());
        Ok(())
    }

    #[test]
    fn test_write_feeds_rejects_category_slug_collision() -> Result<()> {
        let output = tempfile::tempdir()?;
        let site_url = Url::parse("https://blog.example.org/")?;
        let config = FeedConfig {
            title: String::from("Example blog"),
            site_url: &site_url,
            author: None,
        };
        let site = Site::new(vec![
            "Title: a\nDate: 2018-02-20\nCategory: C++\n\n".parse::<Document>().unwrap(),
            "Title: b\nDate: 2018-08-14\nCategory: C\n\n".parse::<Document>().unwrap(),
        ]);

        let result = write_feeds(
            &config,
            &site,
            output.path(),
            Some(Path::new("feeds/atom.xml")),
            Some("feeds/%s.atom.xml"),
        );
        match result {
            Err(Error::SlugCollision { slug, .. }) => assert_eq!("c", slug),
            other => panic!("wanted a slug collision; got {:?}", other),
        }
        assert!(!output.path().join("feeds").exists());
        Ok(())
    }

    #[test]
    fn test_write_feeds_disabled() -> Result<()> {
        let output = tempfile::tempdir()?;
        let site_url = Url::parse("https://blog.example.org/")?;
        let config = FeedConfig {
            title: String::new(),
            site_url: &site_url,
            author: None,
        };
        assert!(write_feeds(&config, &site(), output.path(), None, None)?.is_empty());
        Ok(())
    }
}
