//! Directory listings
//!
//! Renders a directory resource as a small XHTML page. Entries can be
//! sorted by name, size or modification time through the `C` (column) and
//! `O` (order) query parameters, e.g. `?C=M&O=D`.

use super::ResourceContent;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::future::Future;
use std::io;
use std::time::SystemTime;

/// Characters escaped in listing links
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/');

/// Renders a directory as an HTML document
pub trait DirectoryRenderer: Send + Sync {
    /// `base` is the encoded request path ending in `/`; `parent` asks for a
    /// link to the parent directory. `None` means the directory cannot be
    /// listed.
    fn render(
        &self,
        directory: &ResourceContent,
        base: &str,
        parent: bool,
        query: Option<&str>,
    ) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortColumn {
    Name,
    Modified,
    Size,
}

struct Entry {
    name: String,
    is_dir: bool,
    size: u64,
    modified: Option<SystemTime>,
}

/// Default XHTML listing
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlListing;

impl DirectoryRenderer for HtmlListing {
    async fn render(
        &self,
        directory: &ResourceContent,
        base: &str,
        parent: bool,
        query: Option<&str>,
    ) -> io::Result<Option<String>> {
        if !directory.is_directory {
            return Ok(None);
        }
        let mut read_dir = match tokio::fs::read_dir(&directory.resource).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        while let Some(dir_entry) = read_dir.next_entry().await? {
            let Ok(metadata) = dir_entry.metadata().await else {
                continue;
            };
            entries.push(Entry {
                name: dir_entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }

        let (column, descending) = parse_sort(query);
        entries.sort_by(|a, b| {
            let ord = compare(a, b, column);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });

        Ok(Some(render_page(base, parent, &entries, column, descending)))
    }
}

fn parse_sort(query: Option<&str>) -> (SortColumn, bool) {
    let mut column = SortColumn::Name;
    let mut descending = false;
    for pair in query.unwrap_or("").split('&') {
        match pair.split_once('=') {
            Some(("C", "M")) => column = SortColumn::Modified,
            Some(("C", "S")) => column = SortColumn::Size,
            Some(("C", "N")) => column = SortColumn::Name,
            Some(("O", "D")) => descending = true,
            Some(("O", "A")) => descending = false,
            _ => {}
        }
    }
    (column, descending)
}

fn compare(a: &Entry, b: &Entry, column: SortColumn) -> Ordering {
    let by_name = || a.name.cmp(&b.name);
    match column {
        SortColumn::Name => by_name(),
        SortColumn::Modified => a.modified.cmp(&b.modified).then_with(by_name),
        SortColumn::Size => a.size.cmp(&b.size).then_with(by_name),
    }
}

fn render_page(
    base: &str,
    parent: bool,
    entries: &[Entry],
    column: SortColumn,
    descending: bool,
) -> String {
    let title = escape_html(base);
    let mut html = String::with_capacity(1024 + entries.len() * 160);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html xmlns=\"http://www.w3.org/1999/xhtml\" lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\"/>\n<title>Directory: {title}</title>\n</head>\n<body>\n\
         <h1>Directory: {title}</h1>\n<table>\n<thead>\n<tr>"
    );
    for (label, col, key) in [
        ("Name", SortColumn::Name, 'N'),
        ("Last Modified", SortColumn::Modified, 'M'),
        ("Size", SortColumn::Size, 'S'),
    ] {
        let order = if col == column && !descending { 'D' } else { 'A' };
        let _ = write!(html, "<th><a href=\"?C={key}&amp;O={order}\">{label}</a></th>");
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    if parent {
        html.push_str("<tr><td><a href=\"../\">Parent Directory</a></td><td>-</td><td>-</td></tr>\n");
    }

    for entry in entries {
        let slash = if entry.is_dir { "/" } else { "" };
        let href = format!(
            "{base}{}{slash}",
            utf8_percent_encode(&entry.name, PATH_SEGMENT)
        );
        let modified = entry.modified.map_or_else(
            || "-".to_string(),
            |m| DateTime::<Utc>::from(m).format("%Y-%m-%d %H:%M").to_string(),
        );
        let size = if entry.is_dir {
            "-".to_string()
        } else {
            entry.size.to_string()
        };
        let _ = writeln!(
            html,
            "<tr><td><a href=\"{}\">{}{slash}</a></td><td>{modified}</td><td>{size}</td></tr>",
            escape_html(&href),
            escape_html(&entry.name),
        );
    }

    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
