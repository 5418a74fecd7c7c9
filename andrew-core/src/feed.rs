//! sitemap.xml and rss.xml, built from the same page enumeration the table
//! of contents uses.

use html_escape::encode_text;

use crate::config::SiteConfig;
use crate::error::Result;
use crate::page::INDEX_PAGE;
use crate::scanner::enumerate_pages;
use crate::site::SiteFiles;

const RFC1123Z: &str = "%a, %d %b %Y %H:%M:%S %z";

/// A sitemap listing every html file in the site. Index pages are listed
/// by their directory URL.
pub fn sitemap<F>(files: &F, base_url: &str) -> Result<String>
where
    F: SiteFiles + ?Sized,
{
    let base_url = base_url.trim_end_matches('/');
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for entry in files.walk("")? {
        if entry.is_dir || entry.extension() != Some("html") {
            continue;
        }

        let path = if entry.file_name() == INDEX_PAGE {
            entry.path.strip_suffix(INDEX_PAGE).unwrap_or_default()
        } else {
            entry.path.as_str()
        };

        xml.push_str(&format!(
            "\t<url>\n\t\t<loc>{base_url}/{}</loc>\n\t</url>\n",
            encode_text(path)
        ));
    }

    xml.push_str("</urlset>\n");
    Ok(xml)
}

/// An RSS 2.0 channel with one item per non-index page, newest first.
pub fn rss<F>(files: &F, site: &SiteConfig) -> Result<String>
where
    F: SiteFiles + ?Sized,
{
    let base_url = site.base_url.trim_end_matches('/');
    let rss_url = format!("{base_url}/rss.xml");
    let channel_title = encode_text(&site.rss_title);

    let mut xml = String::from(
        "<?xml version=\"1.0\"?>\n\
         <rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n\
         <channel>\n",
    );

    xml.push_str(&format!(
        "\t<title>{channel_title}</title>\n\
         \t<link>{base_url}</link>\n\
         \t<description>{}</description>\n\
         \t<generator>Andrew</generator>\n",
        encode_text(&site.rss_description)
    ));

    for page in enumerate_pages(files, "")? {
        xml.push_str(&format!(
            "\t<item>\n\
             \t\t<title>{}</title>\n\
             \t\t<link>{base_url}/{}</link>\n\
             \t\t<pubDate>{}</pubDate>\n\
             \t\t<source url=\"{rss_url}\">{channel_title}</source>\n\
             \t</item>\n",
            encode_text(&page.title),
            encode_text(&page.url_path),
            page.publish_time.format(RFC1123Z),
        ));
    }

    xml.push_str("</channel>\n</rss>\n");
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::site::MemFs;

    #[test]
    fn sitemap_lists_directories_for_index_pages() {
        let files = MemFs::new()
            .with_file("index.html", "")
            .with_file("page.html", "")
            .with_file("blog/index.html", "")
            .with_file("style.css", "");

        let xml = sitemap(&files, "http://localhost:8080/").unwrap();

        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">
\t<url>
\t\t<loc>http://localhost:8080/blog/</loc>
\t</url>
\t<url>
\t\t<loc>http://localhost:8080/</loc>
\t</url>
\t<url>
\t\t<loc>http://localhost:8080/page.html</loc>
\t</url>
</urlset>
";
        assert_eq!(xml, expected);
    }

    #[test]
    fn rss_feed_includes_channel_and_items() {
        let files = MemFs::new()
            .with_file("index.html", "")
            .with_file("page.html", "");
        let site = SiteConfig {
            base_url: "http://localhost:8080".into(),
            rss_title: "PlayTechnique".into(),
            rss_description: "Learning to play better.".into(),
        };

        let xml = rss(&files, &site).unwrap();

        let expected = "<?xml version=\"1.0\"?>
<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">
<channel>
\t<title>PlayTechnique</title>
\t<link>http://localhost:8080</link>
\t<description>Learning to play better.</description>
\t<generator>Andrew</generator>
\t<item>
\t\t<title>page.html</title>
\t\t<link>http://localhost:8080/page.html</link>
\t\t<pubDate>Thu, 01 Jan 1970 00:00:00 +0000</pubDate>
\t\t<source url=\"http://localhost:8080/rss.xml\">PlayTechnique</source>
\t</item>
</channel>
</rss>
";
        assert_eq!(xml, expected);
    }

    #[test]
    fn rss_items_are_newest_first_and_escaped() {
        let epoch = SystemTime::UNIX_EPOCH;
        let files = MemFs::new()
            .with_file_modified("old.html", "<title>Fish & Chips</title>", epoch)
            .with_file_modified("new.html", "", epoch + Duration::from_secs(3600));

        let xml = rss(&files, &SiteConfig::default()).unwrap();

        let new = xml.find("new.html</title>").unwrap();
        let old = xml.find("Fish &amp; Chips").unwrap();
        assert!(new < old);
    }
}
