//! Defines the [`Collector`], which finds source files in a content directory
//! and parses them into [`Document`]s. See [`crate::frontmatter`] for the
//! source format.

use crate::document::{newest_first, Document};
use crate::frontmatter::{self, MalformedDocument};
use chrono::{FixedOffset, Offset, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What to do with a source file whose front matter can't be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log a warning and leave the document out.
    Skip,

    /// Stop collecting and return the error.
    Abort,
}

/// Collects [`Document`]s from source files.
#[derive(Clone, Debug)]
pub struct Collector {
    /// Extensions (without the leading dot) of files to parse. Other files
    /// are ignored.
    pub extensions: Vec<String>,

    /// The offset for dates written without one.
    pub default_offset: FixedOffset,

    pub on_malformed: MalformedPolicy,

    /// The number of parser threads. Fewer than 2 parses on the calling
    /// thread.
    pub threads: usize,
}

impl Default for Collector {
    fn default() -> Self {
        Collector {
            extensions: vec![
                String::from("md"),
                String::from("markdown"),
                String::from("txt"),
            ],
            default_offset: Utc.fix(),
            on_malformed: MalformedPolicy::Skip,
            threads: 1,
        }
    }
}

impl Collector {
    /// Walks `dir` recursively and returns the [`Document`]s parsed from its
    /// source files, most recent first (see [`newest_first`]). Unreadable
    /// files always fail the collection; malformed ones are handled per
    /// [`Collector::on_malformed`].
    pub fn collect(&self, dir: &Path) -> Result<Vec<Document>> {
        let paths = self.sources(dir)?;
        debug!("Found {} source files in `{}`", paths.len(), dir.display());

        let results = if self.threads < 2 {
            paths.iter().map(|path| self.load(path)).collect()
        } else {
            self.load_parallel(&paths)?
        };

        let mut documents = Vec::with_capacity(results.len());
        let mut skipped = 0;
        for result in results {
            match result {
                Ok(document) => documents.push(document),
                Err(Error::Malformed { path, err })
                    if self.on_malformed == MalformedPolicy::Skip =>
                {
                    warn!("Skipping `{}`: {}", path.display(), err);
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        documents.sort_by(newest_first);
        info!(
            "Collected {} documents from `{}` ({} skipped)",
            documents.len(),
            dir.display(),
            skipped
        );
        Ok(documents)
    }

    /// Reads and parses a single source file.
    pub fn load(&self, path: &Path) -> Result<Document> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::Read {
            path: path.to_owned(),
            err,
        })?;
        frontmatter::parse(&contents, &self.default_offset).map_err(|err| Error::Malformed {
            path: path.to_owned(),
            err,
        })
    }

    // Parses `paths` on a pool of `self.threads` workers. The results are
    // returned in the same order as `paths`.
    fn load_parallel(&self, paths: &[PathBuf]) -> Result<Vec<Result<Document>>> {
        use crossbeam_channel::unbounded;
        use std::thread;

        let (tx, rx) = unbounded::<(usize, PathBuf)>();
        let threads = self.threads.min(paths.len()).max(1);
        let mut workers = Vec::with_capacity(threads);

        for _ in 0..threads {
            let rx = rx.clone();
            let collector = self.clone();
            workers.push(thread::spawn(move || {
                let mut v: Vec<(usize, Result<Document>)> = Vec::new();
                for (i, path) in rx {
                    v.push((i, collector.load(&path)));
                }
                v
            }));
        }

        for (i, path) in paths.iter().enumerate() {
            tx.send((i, path.clone()))
                .map_err(|_| Error::WorkerPanicked)?;
        }
        drop(tx);

        let mut results = Vec::with_capacity(paths.len());
        for worker in workers {
            results.extend(worker.join().map_err(|_| Error::WorkerPanicked)?);
        }
        results.sort_by_key(|(i, _)| *i);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    // Lists the source files under `dir`, ordered by path.
    fn sources(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for result in WalkDir::new(dir).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
            let entry = result?;
            if entry.file_type().is_file() && self.is_source(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    fn is_source(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.extensions.iter().any(|e| e == ext),
            None => false,
        }
    }
}

/// Represents the result of a collection operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error collecting [`Document`]s.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file can't be read (including when it isn't
    /// valid UTF-8).
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when the content directory can't be walked.
    WalkDir(walkdir::Error),

    /// Returned when a source file's front matter is malformed and the policy
    /// is [`MalformedPolicy::Abort`].
    Malformed {
        path: PathBuf,
        err: MalformedDocument,
    },

    /// Returned when a parser thread panics.
    WorkerPanicked,
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Read { path, err } => {
                write!(f, "Reading `{}`: {}", path.display(), err)
            }
            Error::WalkDir(err) => err.fmt(f),
            Error::Malformed { path, err } => {
                write!(f, "Parsing `{}`: {}", path.display(), err)
            }
            Error::WorkerPanicked => write!(f, "A parser thread panicked"),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { path: _, err } => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Malformed { path: _, err } => Some(err),
            Error::WorkerPanicked => None,
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator while walking the content directory.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}
