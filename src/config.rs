//! Loads the project configuration from a `quire.yaml` file. Every key is
//! optional:
//!
//! ```yaml
//! site_name: dmbaturin's blog
//! site_url: https://blog.baturin.org/
//! author: Daniil Baturin
//! timezone: Etc/UTC
//! content_path: content
//! extensions: [md, markdown, txt]
//! default_pagination: 10
//! on_malformed: skip
//! feed_all_atom: feeds/atom.xml
//! category_feed_atom: feeds/%s.atom.xml
//! ```

use crate::collect::{Collector, MalformedPolicy};
use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "quire.yaml";

/// A fixed UTC offset, written either as a UTC alias (`UTC`, `Etc/UTC`,
/// `GMT`, `Z`) or as `+HH:MM`/`-HHMM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timezone(pub FixedOffset);

impl Default for Timezone {
    fn default() -> Self {
        Timezone(Utc.fix())
    }
}

impl FromStr for Timezone {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let "UTC" | "Etc/UTC" | "GMT" | "Etc/GMT" | "Z" = s {
            return Ok(Timezone::default());
        }

        let invalid = || anyhow!("Invalid timezone `{}`: expected `UTC` or `+HH:MM`", s);
        if !s.is_ascii() {
            return Err(invalid());
        }
        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = match rest.split_once(':') {
            Some(parts) => parts,
            None if rest.len() == 4 => rest.split_at(2),
            None => return Err(invalid()),
        };
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(hours) || !digits(minutes) {
            return Err(invalid());
        }
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Timezone)
            .ok_or_else(invalid)
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Timezone, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse::<Timezone>()
            .map_err(|e| D::Error::custom(format!("{}", e)))
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct Project {
    site_name: String,
    site_url: Option<Url>,
    author: Option<String>,
    timezone: Timezone,
    content_path: PathBuf,
    extensions: Vec<String>,
    default_pagination: usize,
    on_malformed: MalformedPolicy,
    feed_all_atom: Option<PathBuf>,
    category_feed_atom: Option<String>,
    threads: Option<usize>,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            site_name: String::new(),
            site_url: None,
            author: None,
            timezone: Timezone::default(),
            content_path: PathBuf::from("content"),
            extensions: vec![
                String::from("md"),
                String::from("markdown"),
                String::from("txt"),
            ],
            default_pagination: 10,
            on_malformed: MalformedPolicy::Skip,
            feed_all_atom: Some(PathBuf::from("feeds/atom.xml")),
            category_feed_atom: Some(String::from("feeds/%s.atom.xml")),
            threads: None,
        }
    }
}

/// The resolved project configuration. Paths are relative to the directory
/// containing the project file.
#[derive(Debug)]
pub struct Config {
    pub site_name: String,

    /// The base URL for document links. Always ends in a trailing slash.
    pub site_url: Option<Url>,

    /// The default author, used in feeds.
    pub author: Option<String>,

    /// The offset for dates written without one.
    pub timezone: FixedOffset,

    /// The directory searched for source documents.
    pub content_directory: PathBuf,

    /// File extensions (without the leading dot) of source documents.
    pub extensions: Vec<String>,

    /// The number of documents per index page. Never zero.
    pub page_size: usize,

    pub on_malformed: MalformedPolicy,

    /// Where to write the feed of all documents, relative to the output
    /// directory. [`None`] disables it.
    pub feed_all_atom: Option<PathBuf>,

    /// The path pattern for per-category feeds, relative to the output
    /// directory. `%s` is replaced by the category slug. [`None`] disables
    /// them.
    pub category_feed_atom: Option<String>,

    /// The number of parser threads. Fewer than 2 parses on the calling
    /// thread.
    pub threads: usize,
}

impl Config {
    /// Searches `dir` and each of its ancestors for a [`PROJECT_FILE`] and
    /// loads the first one found. `threads` overrides the project setting.
    pub fn from_directory(dir: &Path, threads: Option<usize>) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, threads)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, threads),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, threads: Option<usize>) -> Result<Config> {
        let file = File::open(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = serde_yaml::from_reader(file)
            .with_context(|| format!("Loading configuration `{}`", path.display()))?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Config::from_project(project, project_root, threads),
        }
    }

    fn from_project(project: Project, project_root: &Path, threads: Option<usize>) -> Result<Config> {
        if project.default_pagination == 0 {
            return Err(anyhow!("`default_pagination` must be at least 1"));
        }
        Ok(Config {
            site_name: project.site_name,
            site_url: project.site_url.map(with_trailing_slash),
            author: project.author,
            timezone: project.timezone.0,
            content_directory: project_root.join(project.content_path),
            extensions: project
                .extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_owned())
                .collect(),
            page_size: project.default_pagination,
            on_malformed: project.on_malformed,
            feed_all_atom: project.feed_all_atom,
            category_feed_atom: project.category_feed_atom,
            threads: match threads.or(project.threads) {
                None => num_cpus::get(),
                Some(threads) => threads,
            },
        })
    }

    /// Builds a [`Collector`] for this project's content.
    pub fn collector(&self) -> Collector {
        Collector {
            extensions: self.extensions.clone(),
            default_offset: self.timezone,
            on_malformed: self.on_malformed,
            threads: self.threads,
        }
    }
}

// A base URL without a trailing slash would have its last segment replaced
// by `Url::join`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_timezone_from_str() -> Result<()> {
        assert_eq!(Timezone::default(), "Etc/UTC".parse::<Timezone>()?);
        assert_eq!(FixedOffset::east_opt(2 * 3600 + 1800).unwrap(), "+02:30".parse::<Timezone>()?.0);
        assert_eq!(FixedOffset::west_opt(5 * 3600).unwrap(), "-0500".parse::<Timezone>()?.0);
        assert!("Europe/Helsinki".parse::<Timezone>().is_err());
        assert!("+02:75".parse::<Timezone>().is_err());
        assert!("+48:00".parse::<Timezone>().is_err());
        assert!("+02:-30".parse::<Timezone>().is_err());
        assert!("+-1:00".parse::<Timezone>().is_err());
        assert!("+02:".parse::<Timezone>().is_err());
        Ok(())
    }

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let root = tempfile::tempdir()?;
        fs::write(
            root.path().join(PROJECT_FILE),
            "site_name: dmbaturin's blog\n\
             site_url: https://blog.baturin.org\n\
             timezone: '+03:00'\n\
             default_pagination: 5\n\
             on_malformed: abort\n\
             extensions: [.md]\n\
             feed_all_atom: null\n",
        )?;
        let nested = root.path().join("content").join("drafts");
        fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested, Some(3))?;
        assert_eq!("dmbaturin's blog", config.site_name);
        assert_eq!(
            Some("https://blog.baturin.org/"),
            config.site_url.as_ref().map(Url::as_str),
        );
        assert_eq!(FixedOffset::east_opt(3 * 3600).unwrap(), config.timezone);
        assert_eq!(root.path().join("content"), config.content_directory);
        assert_eq!(vec![String::from("md")], config.extensions);
        assert_eq!(5, config.page_size);
        assert_eq!(MalformedPolicy::Abort, config.on_malformed);
        assert_eq!(None, config.feed_all_atom);
        assert_eq!(Some(String::from("feeds/%s.atom.xml")), config.category_feed_atom);
        assert_eq!(3, config.threads);
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(PROJECT_FILE);
        fs::write(&path, "{}\n")?;

        let config = Config::from_project_file(&path, Some(1))?;
        assert_eq!(None, config.site_url);
        assert_eq!(Utc.fix(), config.timezone);
        assert_eq!(10, config.page_size);
        assert_eq!(MalformedPolicy::Skip, config.on_malformed);
        assert_eq!(Some(PathBuf::from("feeds/atom.xml")), config.feed_all_atom);
        Ok(())
    }

    #[test]
    fn test_missing_project_file_names_path() -> Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(PROJECT_FILE);
        let err = Config::from_project_file(&path, None).unwrap_err();
        assert!(format!("{}", err).contains("Opening project file"));
        Ok(())
    }

    #[test]
    fn test_zero_pagination_rejected() -> Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(PROJECT_FILE);
        fs::write(&path, "default_pagination: 0\n")?;
        assert!(Config::from_project_file(&path, None).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_timezone_rejected() -> Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(PROJECT_FILE);
        fs::write(&path, "timezone: somewhere\n")?;
        assert!(Config::from_project_file(&path, None).is_err());
        Ok(())
    }
}
