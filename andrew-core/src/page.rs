use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::meta::{extract_publish_time, extract_title};
use crate::scanner::discover;
use crate::site::{SiteFiles, file_name, normalize};
use crate::template::{RenderMode, render_with};

/// File name that marks a directory's index page.
pub const INDEX_PAGE: &str = "index.html";

/// One content file and the metadata parsed out of it.
///
/// Two pages are the same page when both `url_path` and `content` match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    /// The part of the URL after `protocol://hostname/`. Relative to the site
    /// root for a requested page, relative to the requesting page's
    /// directory for a discovered one. Never starts with `/`.
    pub url_path: String,
    pub content: String,
    pub publish_time: DateTime<Utc>,
}

impl Page {
    /// Read a page from the site tree. The content is left unrendered.
    pub fn read<F>(files: &F, url_path: &str) -> Result<Self>
    where
        F: SiteFiles + ?Sized,
    {
        let path = normalize(url_path);
        let content = files.read(path)?;

        Self::from_bytes(files, path, &content)
    }

    /// Build a page from content that has already been read from `path`.
    pub fn from_bytes<F>(files: &F, path: &str, content: &[u8]) -> Result<Self>
    where
        F: SiteFiles + ?Sized,
    {
        let path = normalize(path);
        let title = extract_title(path, content)?;
        let publish_time = extract_publish_time(files, path, content)?;

        Ok(Self {
            title,
            url_path: path.to_string(),
            content: String::from_utf8_lossy(content).into_owned(),
            publish_time,
        })
    }

    pub fn with_url_path(mut self, url_path: impl Into<String>) -> Self {
        self.url_path = url_path.into();
        self
    }

    pub fn file_name(&self) -> &str {
        file_name(&self.url_path)
    }

    /// The directory part of `url_path`, trailing `/` included; empty for
    /// pages at the root.
    pub fn directory(&self) -> &str {
        match self.url_path.rfind('/') {
            Some(idx) => &self.url_path[..=idx],
            None => "",
        }
    }

    pub fn is_index(&self) -> bool {
        self.file_name() == INDEX_PAGE
    }

    pub fn publish_date(&self) -> String {
        self.publish_time.format("%Y-%m-%d").to_string()
    }
}

/// Read a page and expand any table of contents placeholder it carries.
///
/// Sibling discovery only happens when the page asks for a table of
/// contents, so a broken page only breaks the pages that list it. Content
/// that is not utf-8 is decoded lossily; see [`render_page_bytes`].
pub fn render_page<F>(files: &F, url_path: &str) -> Result<Page>
where
    F: SiteFiles + ?Sized,
{
    let page = Page::read(files, url_path)?;
    expand(files, page)
}

/// The bytes to serve for a page. Without a placeholder these are exactly
/// the bytes on disk, whatever their encoding.
pub fn render_page_bytes<F>(files: &F, url_path: &str) -> Result<Vec<u8>>
where
    F: SiteFiles + ?Sized,
{
    let path = normalize(url_path);
    let raw = files.read(path)?;

    if RenderMode::detect(&String::from_utf8_lossy(&raw)) == RenderMode::None {
        return Ok(raw);
    }

    let page = Page::from_bytes(files, path, &raw)?;
    Ok(expand(files, page)?.content.into_bytes())
}

fn expand<F>(files: &F, mut page: Page) -> Result<Page>
where
    F: SiteFiles + ?Sized,
{
    let mode = RenderMode::detect(&page.content);
    if mode == RenderMode::None {
        return Ok(page);
    }

    let siblings = discover(files, &page.url_path, false)?;
    log::debug!(
        "{}: rendering {:?} over {} pages",
        page.url_path,
        mode,
        siblings.len()
    );

    page.content = render_with(mode, &siblings, &page)?;

    Ok(page)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::ErrorKind;
    use crate::site::MemFs;

    fn hours_ago(now: SystemTime, hours: u64) -> SystemTime {
        now - Duration::from_secs(hours * 3600)
    }

    #[test]
    fn directory_keeps_trailing_separator() {
        let page = Page {
            title: String::new(),
            url_path: "music/jazz/bebop.html".into(),
            content: String::new(),
            publish_time: DateTime::<Utc>::MIN_UTC,
        };

        assert_eq!(page.directory(), "music/jazz/");
        assert_eq!(page.file_name(), "bebop.html");
        assert_eq!(page.clone().with_url_path("top.html").directory(), "");
        assert!(!page.is_index());
    }

    #[test]
    fn page_without_placeholder_is_served_unchanged() {
        let content = "\n<!DOCTYPE html>\n<head>\n  <title>index title</title>\n</head>\n<body>\n</body>\n";
        let files = MemFs::new().with_file("index.html", content);

        let page = render_page(&files, "/index.html").unwrap();

        assert_eq!(page.content, content);
        assert_eq!(page.title, "index title");
        assert_eq!(page.url_path, "index.html");
    }

    #[test]
    fn table_of_contents_in_content_root() {
        let files = MemFs::new()
            .with_file("index.html", "<body>\n{{ AndrewTableOfContents }}\n</body>\n")
            .with_file(
                "pages/1-2-3.html",
                "<!doctype HTML>\n<head>\n<title>1-2-3 Page</title>\n</head>\n",
            );

        let page = render_page(&files, "index.html").unwrap();

        assert!(page.content.starts_with("<body>\n<div class=\"AndrewTableOfContents\">\n<ul>\n"));
        assert!(page.content.contains(
            r#"<li><a class="andrewtableofcontentslink" id="andrewtableofcontentslink0" href="pages/1-2-3.html">1-2-3 Page</a> - <span class="andrew-page-publish-date">1970-01-01</span></li>"#
        ));
    }

    #[test]
    fn table_of_contents_in_child_directory_links_relative_to_it() {
        let files = MemFs::new()
            .with_file("parentDir/index.html", "{{AndrewTableOfContents}}")
            .with_file("parentDir/childDir/1-2-3.html", "<title>1-2-3 Page</title>")
            .with_file("elsewhere.html", "<title>Elsewhere</title>");

        let page = render_page(&files, "parentDir/index.html").unwrap();

        assert!(page.content.contains(r#"href="childDir/1-2-3.html">1-2-3 Page</a>"#));
        assert!(!page.content.contains("Elsewhere"));
    }

    #[test]
    fn publish_time_meta_overrides_modification_time_in_listing() {
        let now = SystemTime::now();
        let newest = chrono::Utc::now() + chrono::Duration::hours(24);
        let meta = format!(
            r#"<meta name="andrew-publish-time" content="{}">"#,
            newest.format("%Y-%m-%d")
        );

        let files = MemFs::new()
            .with_file_modified("index.html", "{{ AndrewTableOfContents }}", now)
            .with_file_modified("a_older.html", "", hours_ago(now, 24))
            .with_file_modified("c_newer.html", "", now)
            .with_file_modified("b_newest.html", meta, hours_ago(now, 24));

        let page = render_page(&files, "index.html").unwrap();

        let b = page.content.find(r#"href="b_newest.html""#).unwrap();
        let c = page.content.find(r#"href="c_newer.html""#).unwrap();
        let a = page.content.find(r#"href="a_older.html""#).unwrap();
        assert!(b < c && c < a, "{}", page.content);
        assert!(page.content.contains(r#"id="andrewtableofcontentslink0" href="b_newest.html""#));
        assert!(page.content.contains(r#"id="andrewtableofcontentslink2" href="a_older.html""#));
    }

    #[test]
    fn broken_sibling_fails_the_index_but_not_itself() {
        let depth = crate::meta::MAX_DOCUMENT_DEPTH + 1;
        let broken = format!("{}{}", "<div>".repeat(depth + 1), "</div>".repeat(depth + 1));
        let files = MemFs::new()
            .with_file("index.html", "{{ AndrewTableOfContents }}")
            .with_file("leaf.html", "<title>Leaf</title>")
            .with_file("broken.html", broken);

        let err = render_page(&files, "index.html").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);

        let leaf = render_page(&files, "leaf.html").unwrap();
        assert_eq!(leaf.content, "<title>Leaf</title>");
    }

    #[test]
    fn non_utf8_page_is_served_byte_for_byte() {
        let latin1 = b"<p>caf\xe9</p>".to_vec();
        let files = MemFs::new().with_file("latin1.html", latin1.clone());

        let served = render_page_bytes(&files, "/latin1.html").unwrap();

        assert_eq!(served, latin1);
    }

    #[test]
    fn rendered_bytes_expand_placeholders() {
        let files = MemFs::new()
            .with_file("index.html", "{{ AndrewTableOfContents }}")
            .with_file("a.html", "<title>A</title>");

        let served = render_page_bytes(&files, "index.html").unwrap();
        let page = render_page(&files, "index.html").unwrap();

        assert_eq!(served, page.content.into_bytes());
    }

    #[test]
    fn missing_page_is_not_found() {
        let files = MemFs::new();
        let err = render_page(&files, "page.html").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
