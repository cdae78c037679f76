//! Boilerplate removal and text normalization.
//!
//! Pure functions over markup strings. `extract_body` and `clean_content`
//! mirror the plain cleaning path; `clean_and_extract` is the richer variant
//! with best-effort title/description/date heuristics driven by class-name
//! matching. Heuristics are not guaranteed correct; a miss yields an empty
//! string or the "No title found" / "No content found" sentinels.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// Elements whose text never counts as content.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "iframe", "noscript",
];

/// The richer extraction variant additionally drops asides.
const SUMMARY_NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript",
];

const CONTENT_CLASS_HINTS: &[&str] = &["content", "article", "main", "post"];
const DATE_CLASS_HINTS: &[&str] = &["date", "time", "published"];

/// Best-effort structured summary of a page.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub title: String,
    pub meta_description: String,
    pub main_content: String,
    pub date: String,
    pub query_relevance: String,
}

/// Returns the serialized `<body>` subtree, or an empty string when the
/// markup is empty or has no body. Never fails.
pub fn extract_body(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|el| el.html())
        .unwrap_or_default()
}

/// Strips non-content elements and collapses the remaining visible text into
/// trimmed, non-blank lines.
pub fn clean_content(body_markup: &str) -> String {
    if body_markup.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(body_markup);
    let mut pieces = Vec::new();
    collect_text(document.root_element(), NOISE_TAGS, &mut pieces);

    pieces
        .join("\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Richer variant: title, meta description, heuristic main-content and date
/// detection. `query` is carried through for downstream relevance context.
pub fn clean_and_extract(html: &str, query: &str) -> PageSummary {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_else(|| "No title found".to_string());

    let meta_description = Selector::parse("meta[name='description']")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|content| content.to_string())
        })
        .unwrap_or_default();

    let main_content = extract_main_content(&document);

    let date = Selector::parse("time, span, div, p")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .find(|el| class_matches(el, DATE_CLASS_HINTS))
                .map(|el| {
                    el.text()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .concat()
                })
        })
        .unwrap_or_default();

    PageSummary {
        title,
        meta_description,
        main_content,
        date,
        query_relevance: query.to_string(),
    }
}

/// Prefer containers whose class attribute hints at main content; fall back
/// to whole-body text.
fn extract_main_content(document: &Html) -> String {
    let containers: Vec<ElementRef<'_>> = Selector::parse("article, main, div, section")
        .ok()
        .map(|sel| {
            document
                .select(&sel)
                .filter(|el| class_matches(el, CONTENT_CLASS_HINTS))
                .collect()
        })
        .unwrap_or_default();

    let text = if !containers.is_empty() {
        containers
            .iter()
            .map(|el| element_text(*el, SUMMARY_NOISE_TAGS))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    } else {
        let body = Selector::parse("body")
            .ok()
            .and_then(|sel| document.select(&sel).next());
        match body {
            Some(el) => element_text(el, SUMMARY_NOISE_TAGS),
            None => return "No content found".to_string(),
        }
    };

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Visible text of one element, skipping noise tags, stripped per fragment.
fn element_text(element: ElementRef<'_>, skip: &[&str]) -> String {
    let mut pieces = Vec::new();
    collect_text(element, skip, &mut pieces);
    pieces
        .iter()
        .map(|piece| piece.trim())
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, skip: &[&str], out: &mut Vec<String>) {
    if skip.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push(text.to_string());
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, skip, out);
        }
    }
}

fn class_matches(element: &ElementRef<'_>, hints: &[&str]) -> bool {
    match element.value().attr("class") {
        Some(class) => {
            let class = class.to_lowercase();
            hints.iter().any(|hint| class.contains(hint))
        }
        None => false,
    }
}
