//! Defines [`Site`], the site-wide index of collected [`Document`]s. A
//! [`Site`] is built once from the output of
//! [`crate::collect::Collector::collect`] and never changes afterwards; the
//! publishing collaborator borrows [`Listing`]s and [`Page`]s from it.
//!
//! Every listing is ordered most recent first. A listing can be paginated
//! into [`Page`]s of a configurable number of documents each.

use crate::document::{newest_first, Document};
use std::collections::BTreeMap;

/// The immutable index of every collected document.
#[derive(Debug)]
pub struct Site {
    /// Published documents, most recent first.
    documents: Vec<Document>,

    /// Draft documents, most recent first. These never appear in listings.
    drafts: Vec<Document>,

    /// Category name to indices into `documents`.
    categories: BTreeMap<String, Vec<usize>>,

    /// Tag name to indices into `documents`.
    tags: BTreeMap<String, Vec<usize>>,
}

impl Site {
    /// Builds the index. `documents` may be in any order.
    pub fn new(mut documents: Vec<Document>) -> Site {
        documents.sort_by(newest_first);
        let (drafts, documents): (Vec<Document>, Vec<Document>) =
            documents.into_iter().partition(Document::is_draft);

        let mut categories: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut tags: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, document) in documents.iter().enumerate() {
            if let Some(category) = &document.category {
                categories.entry(category.clone()).or_default().push(i);
            }
            for tag in &document.tags {
                tags.entry(tag.clone()).or_default().push(i);
            }
        }

        Site {
            documents,
            drafts,
            categories,
            tags,
        }
    }

    /// Published documents, most recent first.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Draft documents, most recent first.
    pub fn drafts(&self) -> &[Document] {
        &self.drafts
    }

    /// The listing of every published document.
    pub fn listing(&self) -> Listing<'_> {
        Listing {
            documents: self.documents.iter().collect(),
        }
    }

    /// Every category name along with its listing, ordered by name.
    pub fn categories(&self) -> impl Iterator<Item = (&str, Listing<'_>)> {
        self.categories
            .iter()
            .map(move |(name, indices)| (name.as_str(), self.select(indices)))
    }

    /// The listing for a single category, if any published document has it.
    pub fn category(&self, name: &str) -> Option<Listing<'_>> {
        self.categories.get(name).map(|indices| self.select(indices))
    }

    /// Every tag name along with its listing, ordered by name.
    pub fn tags(&self) -> impl Iterator<Item = (&str, Listing<'_>)> {
        self.tags
            .iter()
            .map(move |(name, indices)| (name.as_str(), self.select(indices)))
    }

    /// The listing for a single tag, if any published document has it.
    pub fn tag(&self, name: &str) -> Option<Listing<'_>> {
        self.tags.get(name).map(|indices| self.select(indices))
    }

    fn select(&self, indices: &[usize]) -> Listing<'_> {
        Listing {
            documents: indices.iter().map(|&i| &self.documents[i]).collect(),
        }
    }
}

/// A group of documents borrowed from a [`Site`], most recent first.
#[derive(Clone, Debug)]
pub struct Listing<'a> {
    documents: Vec<&'a Document>,
}

impl<'a> Listing<'a> {
    pub fn documents(&self) -> &[&'a Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Splits the listing into pages of `page_size` documents. The last page
    /// may be shorter; an empty listing has no pages. A `page_size` of zero is
    /// treated as one.
    pub fn pages(&self, page_size: usize) -> Vec<Page<'a>> {
        let page_size = page_size.max(1);
        let total_pages = match self.documents.len() % page_size {
            0 => self.documents.len() / page_size,
            _ => self.documents.len() / page_size + 1,
        };

        self.documents
            .chunks(page_size)
            .enumerate()
            .map(|(i, chunk)| Page {
                number: i,
                documents: chunk.to_vec(),
                prev: match i {
                    0 => None,
                    _ => Some(i - 1),
                },
                next: match i + 1 < total_pages {
                    false => None,
                    true => Some(i + 1),
                },
            })
            .collect()
    }
}

/// One page of a paginated [`Listing`].
#[derive(Clone, Debug)]
pub struct Page<'a> {
    /// The zero-based page number.
    pub number: usize,

    pub documents: Vec<&'a Document>,

    /// The number of the previous page, if any.
    pub prev: Option<usize>,

    /// The number of the next page, if any.
    pub next: Option<usize>,
}

impl Page<'_> {
    /// The conventional file name for the page: `index.html` for the first
    /// page, `{number}.html` for the rest.
    pub fn file_name(&self) -> String {
        match self.number {
            0 => String::from("index.html"),
            n => format!("{}.html", n),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frontmatter::Result;

    fn document(title: &str, date: &str, category: &str, tags: &str) -> Document {
        format!(
            "Title: {}\nDate: {}\nCategory: {}\nTags: {}\n\nbody\n",
            title, date, category, tags
        )
        .parse()
        .unwrap()
    }

    fn titles(documents: &[&Document]) -> Vec<String> {
        documents.iter().map(|d| d.title.clone()).collect()
    }

    fn site() -> Site {
        Site::new(vec![
            document("Blogging tools", "2018-02-20", "misc", ""),
            document("OCaml tutorial", "2018-08-14", "programming", "ocaml"),
            document("Parsers", "2018-05-01", "programming", "ocaml, parsing"),
        ])
    }

    #[test]
    fn test_newest_first() {
        let site = Site::new(vec![
            document("February", "2018-02-20", "misc", ""),
            document("August", "2018-08-14", "misc", ""),
        ]);
        assert_eq!(vec!["August", "February"], titles(site.listing().documents()));
    }

    #[test]
    fn test_categories() {
        let site = site();
        let categories: Vec<(&str, Vec<String>)> = site
            .categories()
            .map(|(name, listing)| (name, titles(listing.documents())))
            .collect();
        assert_eq!(
            vec![
                ("misc", vec![String::from("Blogging tools")]),
                (
                    "programming",
                    vec![String::from("OCaml tutorial"), String::from("Parsers")],
                ),
            ],
            categories,
        );
        assert!(site.category("travel").is_none());
    }

    #[test]
    fn test_tags() {
        let site = site();
        let ocaml = site.tag("ocaml").map(|l| titles(l.documents()));
        assert_eq!(
            Some(vec![String::from("OCaml tutorial"), String::from("Parsers")]),
            ocaml,
        );
        assert_eq!(1, site.tag("parsing").map_or(0, |l| l.len()));
        assert_eq!(2, site.tags().count());
    }

    #[test]
    fn test_drafts_are_not_listed() -> Result<()> {
        let draft: Document = "Title: Draft\nDate: 2019-01-01\nCategory: misc\nStatus: draft\n\n".parse()?;
        let mut documents = vec![draft];
        documents.push(document("Published", "2018-01-01", "misc", ""));
        let site = Site::new(documents);
        assert_eq!(vec!["Published"], titles(site.listing().documents()));
        assert_eq!(1, site.category("misc").map_or(0, |l| l.len()));
        assert_eq!(1, site.drafts().len());
        Ok(())
    }

    #[test]
    fn test_pages() {
        let site = site();
        let pages = site.listing().pages(2);
        assert_eq!(2, pages.len());

        assert_eq!("index.html", pages[0].file_name());
        assert_eq!(None, pages[0].prev);
        assert_eq!(Some(1), pages[0].next);
        assert_eq!(vec!["OCaml tutorial", "Parsers"], titles(&pages[0].documents));

        assert_eq!("1.html", pages[1].file_name());
        assert_eq!(Some(0), pages[1].prev);
        assert_eq!(None, pages[1].next);
        assert_eq!(vec!["Blogging tools"], titles(&pages[1].documents));
    }

    #[test]
    fn test_pages_exact_fit_and_empty() {
        let site = site();
        let pages = site.listing().pages(3);
        assert_eq!(1, pages.len());
        assert_eq!(None, pages[0].next);

        assert!(Site::new(Vec::new()).listing().pages(10).is_empty());
    }
}
