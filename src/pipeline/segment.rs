//! Markdown segmentation: one [`Section`] per header.
//!
//! A header is a line starting with 1–6 `#` characters followed by
//! whitespace. Each section runs from its header to the next header (or the
//! end of the document). Text before the first header belongs to no section.
//! Code fences are not special: a `# comment` line inside one starts a
//! section like any other header.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*)$").unwrap());

/// A titled span of the source document. Order in the returned list is
/// document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
}

/// Split `markdown` into sections.
///
/// With `title` set, the document is treated as if it started with
/// `# {title}`, so any preamble before the first real header becomes the
/// body of that title section.
pub fn split_sections(markdown: &str, title: Option<&str>) -> Vec<Section> {
    let document = match title {
        Some(t) => format!("# {}\n{}", t, markdown),
        None => markdown.to_string(),
    };

    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in document.lines() {
        if let Some(caps) = HEADER.captures(line) {
            if let Some((t, body)) = current.take() {
                sections.push(finish(t, &body));
            }
            current = Some((caps[2].trim().to_string(), Vec::new()));
            continue;
        }

        if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((t, body)) = current.take() {
        sections.push(finish(t, &body));
    }
    sections
}

fn finish(title: String, body: &[&str]) -> Section {
    Section {
        title,
        content: body.join("\n").trim().to_string(),
    }
}
