//! Metadata pulled out of a page's HTML: its title, its `<meta>` elements
//! and the publish time derived from them.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tl::{HTMLTag, Node, NodeHandle, Parser, ParserOptions, VDom};

use crate::error::{Error, Result};
use crate::site::{SiteFiles, file_name, normalize};

/// Name of the meta element that overrides a page's modification time.
pub const PUBLISH_TIME_META: &str = "andrew-publish-time";

/// `content` format of a full publish timestamp, read as UTC.
pub const PUBLISH_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const PUBLISH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Documents nested deeper than this are rejected rather than walked.
pub const MAX_DOCUMENT_DEPTH: usize = 512;

/// The page title: the first `<title>` element's text, or the file name
/// when the document has no usable title.
pub fn extract_title(path: &str, content: &[u8]) -> Result<String> {
    let title = title_from_html(path, content)?;

    Ok(title.unwrap_or_else(|| file_name(normalize(path)).to_string()))
}

/// Every `<meta name=.. content=..>` pair in the document. A later element
/// with the same name replaces an earlier one.
pub fn meta_elements(path: &str, content: &[u8]) -> Result<HashMap<String, String>> {
    let html = String::from_utf8_lossy(content);
    let dom = parse(path, &html)?;

    let mut elements = HashMap::new();

    walk_tags(path, &dom, |tag| {
        if !is_named(tag, "meta") {
            return Visit::Continue;
        }

        let mut name = None;
        let mut value = String::new();
        for (key, attr) in tag.attributes().iter() {
            match key.as_ref() {
                "name" => name = attr.map(|v| v.to_string()),
                "content" => value = attr.map(|v| v.to_string()).unwrap_or_default(),
                _ => {}
            }
        }

        if let Some(name) = name {
            elements.insert(name, value);
        }

        Visit::Continue
    })?;

    Ok(elements)
}

/// When the page was published.
///
/// Defaults to the file's modification time. A parseable
/// `andrew-publish-time` meta element wins over it; an unparseable one is
/// ignored.
pub fn extract_publish_time<F>(files: &F, path: &str, content: &[u8]) -> Result<DateTime<Utc>>
where
    F: SiteFiles + ?Sized,
{
    let modified: DateTime<Utc> = files.modified(path)?.into();

    let meta = meta_elements(path, content)?;

    let Some(value) = meta.get(PUBLISH_TIME_META) else {
        return Ok(modified);
    };

    match parse_publish_time(value) {
        Some(published) => Ok(published),
        None => {
            log::debug!(
                "{}: ignoring unparseable {} value {:?}",
                path,
                PUBLISH_TIME_META,
                value
            );
            Ok(modified)
        }
    }
}

/// Parse a publish time as a full timestamp, falling back to a bare date.
pub fn parse_publish_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(stamp) = NaiveDateTime::parse_from_str(value, PUBLISH_DATE_TIME_FORMAT) {
        return Some(stamp.and_utc());
    }

    NaiveDate::parse_from_str(value, PUBLISH_DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|stamp| stamp.and_utc())
}

fn title_from_html(path: &str, content: &[u8]) -> Result<Option<String>> {
    let html = String::from_utf8_lossy(content);
    let dom = parse(path, &html)?;
    let parser = dom.parser();

    let mut title = None;

    walk_tags(path, &dom, |tag| {
        if !is_named(tag, "title") {
            return Visit::Continue;
        }
        title = first_text_child(tag, parser);
        Visit::Stop
    })?;

    Ok(title.filter(|t| !t.trim().is_empty()))
}

fn parse<'a>(path: &str, html: &'a str) -> Result<VDom<'a>> {
    tl::parse(html, ParserOptions::default()).map_err(|e| Error::parse(path, format!("{e:?}")))
}

enum Visit {
    Continue,
    Stop,
}

/// Depth-first, document-order walk over every tag, driven by an explicit
/// stack so hostile nesting cannot exhaust the call stack.
fn walk_tags<'a, V>(path: &str, dom: &VDom<'a>, mut visit: V) -> Result<()>
where
    V: FnMut(&HTMLTag<'a>) -> Visit,
{
    let parser = dom.parser();
    let mut stack: Vec<(NodeHandle, usize)> =
        dom.children().iter().rev().map(|handle| (*handle, 0)).collect();

    while let Some((handle, depth)) = stack.pop() {
        if depth > MAX_DOCUMENT_DEPTH {
            return Err(Error::parse(
                path,
                format!("elements nested deeper than {MAX_DOCUMENT_DEPTH}"),
            ));
        }

        let Some(Node::Tag(tag)) = handle.get(parser) else {
            continue;
        };

        if let Visit::Stop = visit(tag) {
            return Ok(());
        }

        let children: Vec<NodeHandle> = tag.children().top().iter().copied().collect();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }

    Ok(())
}

fn is_named(tag: &HTMLTag<'_>, name: &str) -> bool {
    tag.name().as_utf8_str().eq_ignore_ascii_case(name)
}

fn first_text_child(tag: &HTMLTag<'_>, parser: &Parser<'_>) -> Option<String> {
    let first = tag.children().top().iter().next().copied()?;
    match first.get(parser)? {
        Node::Raw(text) => Some(text.as_utf8_str().to_string()),
        _ => None,
    }
}
