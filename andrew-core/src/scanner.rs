use crate::error::Result;
use crate::ordering::sort_by_publish_time;
use crate::page::{INDEX_PAGE, Page};
use crate::site::{Entry, SiteFiles, normalize, parent_dir};

/// Find the pages that live next to or below `page_path`.
///
/// The walk starts at the directory containing `page_path`, and every
/// returned page's `url_path` is relative to that directory. Index pages
/// and anything that is not an `.html` file are skipped. The first file
/// that cannot be read or parsed fails the whole call.
///
/// Pages come back in walk order; callers order them.
pub fn discover<F>(files: &F, page_path: &str, exclude_self: bool) -> Result<Vec<Page>>
where
    F: SiteFiles + ?Sized,
{
    let page_path = normalize(page_path);
    let local_root = parent_dir(page_path);

    log::debug!("discovering pages under {local_root:?} for {page_path}");

    scan(files, local_root, |entry| !(exclude_self && entry.path == page_path))
}

/// Every non-index page at or below `root`, most recently published first.
pub fn enumerate_pages<F>(files: &F, root: &str) -> Result<Vec<Page>>
where
    F: SiteFiles + ?Sized,
{
    let mut pages = scan(files, normalize(root), |_| true)?;
    sort_by_publish_time(&mut pages);

    Ok(pages)
}

fn scan<F, K>(files: &F, local_root: &str, keep: K) -> Result<Vec<Page>>
where
    F: SiteFiles + ?Sized,
    K: Fn(&Entry) -> bool,
{
    let mut pages = Vec::new();

    for entry in files.walk(local_root)? {
        if !is_listable(&entry) || !keep(&entry) {
            continue;
        }
        pages.push(scan_page(files, local_root, &entry)?);
    }

    Ok(pages)
}

fn is_listable(entry: &Entry) -> bool {
    !entry.is_dir && !entry.path.contains(INDEX_PAGE) && entry.extension() == Some("html")
}

fn scan_page<F>(files: &F, local_root: &str, entry: &Entry) -> Result<Page>
where
    F: SiteFiles + ?Sized,
{
    let content = files.read(&entry.path)?;
    let page = Page::from_bytes(files, &entry.path, &content)?;

    Ok(page.with_url_path(relative_to(local_root, &entry.path)))
}

fn relative_to(root: &str, path: &str) -> String {
    if root.is_empty() {
        return path.to_string();
    }

    path.strip_prefix(root)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::ErrorKind;
    use crate::site::MemFs;

    fn url_paths(pages: &[Page]) -> Vec<&str> {
        pages.iter().map(|p| p.url_path.as_str()).collect()
    }

    #[test]
    fn skips_index_pages_and_non_html_files() {
        let files = MemFs::new()
            .with_file("index.html", "")
            .with_file("style.css", "")
            .with_file("about.html", "")
            .with_file("notes.htm", "")
            .with_file("blog/index.html", "")
            .with_file("blog/first.html", "<title>First</title>");

        let pages = discover(&files, "index.html", false).unwrap();

        assert_eq!(url_paths(&pages), vec!["about.html", "blog/first.html"]);
        assert_eq!(pages[1].title, "First");
        assert_eq!(pages[0].title, "about.html");
    }

    #[test]
    fn url_paths_are_relative_to_the_local_content_root() {
        let files = MemFs::new()
            .with_file("music/index.html", "")
            .with_file("music/rock.html", "")
            .with_file("music/jazz/bebop.html", "")
            .with_file("film/noir.html", "");

        let pages = discover(&files, "/music/index.html", false).unwrap();

        assert_eq!(url_paths(&pages), vec!["jazz/bebop.html", "rock.html"]);
    }

    #[test]
    fn exclude_self_drops_the_starting_page() {
        let files = MemFs::new()
            .with_file("a.html", "")
            .with_file("b.html", "");

        let all = discover(&files, "a.html", false).unwrap();
        let others = discover(&files, "a.html", true).unwrap();

        assert_eq!(url_paths(&all), vec!["a.html", "b.html"]);
        assert_eq!(url_paths(&others), vec!["b.html"]);
    }

    #[test]
    fn unparseable_page_aborts_discovery() {
        let depth = crate::meta::MAX_DOCUMENT_DEPTH + 2;
        let files = MemFs::new()
            .with_file("index.html", "")
            .with_file("deep/broken.html", "<div>".repeat(depth) + &"</div>".repeat(depth))
            .with_file("fine.html", "");

        let err = discover(&files, "index.html", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn enumerate_pages_orders_by_publish_time() {
        let epoch = SystemTime::UNIX_EPOCH;
        let files = MemFs::new()
            .with_file_modified("old.html", "", epoch + Duration::from_secs(10))
            .with_file_modified("new.html", "", epoch + Duration::from_secs(30))
            .with_file_modified("posts/mid.html", "", epoch + Duration::from_secs(20))
            .with_file_modified("index.html", "", epoch + Duration::from_secs(40));

        let pages = enumerate_pages(&files, ".").unwrap();

        assert_eq!(url_paths(&pages), vec!["new.html", "posts/mid.html", "old.html"]);
    }

    #[test]
    fn discovery_on_disk_reads_real_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("posts")).unwrap();
        std::fs::write(dir.path().join("index.html"), "{{ AndrewTableOfContents }}").unwrap();
        std::fs::write(dir.path().join("posts/hello.html"), "<title>Hello</title>").unwrap();

        let files = crate::site::DirFs::new(dir.path());
        let pages = discover(&files, "index.html", false).unwrap();

        assert_eq!(url_paths(&pages), vec!["posts/hello.html"]);
        assert_eq!(pages[0].title, "Hello");
    }
}
