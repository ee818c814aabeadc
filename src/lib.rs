//! The library code for the `quire` content collector. The architecture can be
//! generally broken down into three steps:
//!
//! 1. Parsing documents from source files on disk ([`crate::frontmatter`] and
//!    [`crate::collect`])
//! 2. Indexing the parsed documents into an immutable [`crate::index::Site`]
//! 3. Handing the site to a publishing collaborator, e.g., the Atom feeds in
//!    [`crate::feed`]
//!
//! Bodies are never interpreted: a [`crate::document::Document`] carries its
//! body as raw text in whatever markup dialect the author wrote it in.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod collect;
pub mod config;
pub mod document;
pub mod feed;
pub mod frontmatter;
pub mod index;
