//! The two orderings a table of contents can be rendered in.

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::page::Page;

/// Most recently published first. Pages published at the same instant keep
/// their relative order.
pub fn sort_by_publish_time(pages: &mut [Page]) {
    pages.sort_by(newest_first);
}

/// Like [`sort_by_publish_time`], without reordering the caller's slice.
pub fn by_publish_time(pages: &[Page]) -> Vec<&Page> {
    let mut ordered: Vec<&Page> = pages.iter().collect();
    ordered.sort_by(|a, b| newest_first(a, b));
    ordered
}

fn newest_first(a: &Page, b: &Page) -> Ordering {
    b.publish_time.cmp(&a.publish_time)
}

/// The pages sharing one containing directory.
#[derive(Debug, Clone)]
pub struct DirectoryGroup<'a> {
    /// Directory part of the pages' `url_path`, with a trailing `/`. Empty
    /// for pages at the local content root.
    pub directory: String,
    pub pages: Vec<&'a Page>,
    pub most_recent: DateTime<Utc>,
}

impl DirectoryGroup<'_> {
    pub fn depth(&self) -> usize {
        directory_depth(&self.directory)
    }

    fn sort_key(&self) -> (Reverse<DateTime<Utc>>, usize, &str) {
        (Reverse(self.most_recent), self.depth(), &self.directory)
    }
}

pub fn directory_depth(directory: &str) -> usize {
    directory.matches('/').count()
}

/// Partition pages by containing directory.
///
/// Groups are ordered by their most recently published page, then by
/// depth (shallow first), then by name. Pages inside a group are ordered by
/// [`sort_by_publish_time`].
pub fn group_by_directory(pages: &[Page]) -> Vec<DirectoryGroup<'_>> {
    let mut by_directory: HashMap<&str, Vec<&Page>> = HashMap::new();
    for page in pages {
        by_directory.entry(page.directory()).or_default().push(page);
    }

    let mut groups: Vec<DirectoryGroup<'_>> = by_directory
        .into_iter()
        .map(|(directory, mut pages)| {
            pages.sort_by(|a, b| newest_first(a, b));
            let most_recent = pages
                .first()
                .map(|page| page.publish_time)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);

            DirectoryGroup {
                directory: directory.to_string(),
                pages,
                most_recent,
            }
        })
        .collect();

    groups.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    groups
}
