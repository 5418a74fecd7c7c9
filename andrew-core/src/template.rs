use std::sync::LazyLock;

use regex::Regex;
use tera::{Context, Tera};

use crate::error::{Error, Result};
use crate::ordering::{by_publish_time, directory_depth, group_by_directory};
use crate::page::Page;

/// Placeholder for a flat, newest-first list of pages.
pub const TABLE_OF_CONTENTS: &str = "AndrewTableOfContents";

/// Placeholder for a list of pages grouped under directory headings.
pub const TABLE_OF_CONTENTS_WITH_DIRECTORIES: &str = "AndrewTableOfContentsWithDirectories";

const LINK_CLASS: &str = "andrewtableofcontentslink";

// A leading `.` is accepted so pages written as `{{ .AndrewTableOfContents }}`
// keep working.
static FLAT_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.?AndrewTableOfContents\s*\}\}").expect("placeholder pattern compiles")
});

static GROUPED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.?AndrewTableOfContentsWithDirectories\s*\}\}")
        .expect("placeholder pattern compiles")
});

static DOTTED_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.(AndrewTableOfContents(?:WithDirectories)?)\s*\}\}")
        .expect("placeholder pattern compiles")
});

/// Which table of contents, if any, a page asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    None,
    Flat,
    Grouped,
}

impl RenderMode {
    /// Sniff a page's content for a placeholder. The flat placeholder wins
    /// when a page carries both.
    pub fn detect(content: &str) -> Self {
        if FLAT_PLACEHOLDER.is_match(content) {
            RenderMode::Flat
        } else if GROUPED_PLACEHOLDER.is_match(content) {
            RenderMode::Grouped
        } else {
            RenderMode::None
        }
    }

    /// The template variable this mode fills in.
    pub fn placeholder(self) -> Option<&'static str> {
        match self {
            RenderMode::None => None,
            RenderMode::Flat => Some(TABLE_OF_CONTENTS),
            RenderMode::Grouped => Some(TABLE_OF_CONTENTS_WITH_DIRECTORIES),
        }
    }
}

/// Render `target`'s content, expanding whichever placeholder it carries
/// into a table of contents over `pages`.
pub fn render(pages: &[Page], target: &Page) -> Result<String> {
    render_with(RenderMode::detect(&target.content), pages, target)
}

/// Render with a mode the caller already detected.
pub fn render_with(mode: RenderMode, pages: &[Page], target: &Page) -> Result<String> {
    let fragment = match mode {
        RenderMode::None => return Ok(target.content.clone()),
        RenderMode::Flat => table_of_contents(pages),
        RenderMode::Grouped => table_of_contents_with_directories(pages, target),
    };

    let mut context = Context::new();
    // the placeholder that lost out renders empty
    context.insert(TABLE_OF_CONTENTS, "");
    context.insert(TABLE_OF_CONTENTS_WITH_DIRECTORIES, "");
    if let Some(name) = mode.placeholder() {
        context.insert(name, &fragment);
    }

    let template = DOTTED_PLACEHOLDER.replace_all(&target.content, "{{ ${1} }}");

    Tera::one_off(&template, &context, false).map_err(|source| Error::Template {
        path: target.url_path.clone(),
        source,
    })
}

/// Hands out link ids, counting up from zero across a whole fragment.
#[derive(Default)]
struct LinkList {
    html: String,
    next_id: usize,
}

impl LinkList {
    fn push_str(&mut self, s: &str) {
        self.html.push_str(s);
    }

    fn push_link(&mut self, page: &Page) {
        self.html.push_str(&format!(
            "<li><a class=\"{LINK_CLASS}\" id=\"{LINK_CLASS}{}\" href=\"{}\">{}</a> - <span class=\"andrew-page-publish-date\">{}</span></li>\n",
            self.next_id,
            page.url_path,
            page.title,
            page.publish_date(),
        ));
        self.next_id += 1;
    }
}

/// Discovered pages carry paths relative to the rendering page's directory,
/// so the rendering page shows up under its bare file name.
fn is_rendering_page(page: &Page, target: &Page) -> bool {
    page.url_path == target.file_name() && page.content == target.content
}

fn table_of_contents(pages: &[Page]) -> String {
    let mut links = LinkList::default();

    links.push_str(&format!("<div class=\"{TABLE_OF_CONTENTS}\">\n<ul>\n"));
    for page in by_publish_time(pages) {
        links.push_link(page);
    }
    links.push_str("</ul>\n</div>\n");

    links.html
}

fn table_of_contents_with_directories(pages: &[Page], target: &Page) -> String {
    let mut links = LinkList::default();

    links.push_str(&format!("<div class=\"{TABLE_OF_CONTENTS_WITH_DIRECTORIES}\">\n"));

    // the rendering page still counts toward its directory's recency
    for group in group_by_directory(pages) {
        let listed: Vec<&Page> = group
            .pages
            .iter()
            .copied()
            .filter(|page| !is_rendering_page(page, target))
            .collect();

        if listed.is_empty() {
            continue;
        }

        links.push_str("<ul>\n");
        if let Some(heading) = directory_heading(&group.directory) {
            links.push_str(&heading);
        }
        for page in listed {
            links.push_link(page);
        }
        links.push_str("</ul>\n");
    }

    links.push_str("</div>\n");

    links.html
}

/// `music/` renders as-is; `music/jazz/` renders with its first segment
/// de-emphasised.
fn directory_heading(directory: &str) -> Option<String> {
    if directory.is_empty() {
        return None;
    }

    if directory_depth(directory) == 1 {
        return Some(format!("<h5>{directory}</h5>\n"));
    }

    let (parent, rest) = directory.split_once('/')?;
    Some(format!(
        "<h5><span class=\"AndrewParentDir\">{parent}/</span>{rest}</h5>\n"
    ))
}
