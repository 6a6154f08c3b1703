//! Structural audit and content synthesis

use crate::enrichment::EnrichmentError;
use crate::storage::SiteAudit;
use scraper::{Html, Selector};

/// Elements that never carry page content
const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript", "form", "svg",
];

/// Candidate main-content regions, most specific first
const MAIN_REGIONS: &[&str] = &["main", "article", "[role='main']", "#content", "body"];

/// Audits the structure of an HTML document
///
/// Counts headings h1 through h6 and words of visible text in the main
/// content region.
pub fn audit_document(html: &str) -> SiteAudit {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title");
    let meta_description = Selector::parse("meta[name='description']")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|c| c.trim().to_string())
        })
        .filter(|c| !c.is_empty());

    let heading_count = count(&document, "h1, h2, h3, h4, h5, h6");
    let h1_count = count(&document, "h1");
    let has_viewport = count(&document, "meta[name='viewport']") > 0;

    let word_count = main_region_html(&document)
        .map(|region| {
            let fragment = Html::parse_fragment(&strip_non_content(&region));
            fragment
                .root_element()
                .text()
                .flat_map(|t| t.split_whitespace())
                .count()
        })
        .unwrap_or(0);

    SiteAudit {
        title,
        meta_description,
        heading_count,
        h1_count,
        word_count,
        has_viewport,
    }
}

/// Converts the main content of a document to normalized markdown
///
/// Non-content elements are dropped before conversion; runs of blank lines
/// are collapsed and trailing whitespace removed.
pub fn synthesize_markdown(html: &str) -> Result<String, EnrichmentError> {
    let document = Html::parse_document(html);
    let region = main_region_html(&document).unwrap_or_else(|| html.to_string());

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(NON_CONTENT_TAGS.to_vec())
        .build();

    let markdown = converter
        .convert(&region)
        .map_err(|e| EnrichmentError::Audit(format!("markdown conversion failed: {}", e)))?;

    Ok(normalize_markdown(&markdown))
}

fn main_region_html(document: &Html) -> Option<String> {
    MAIN_REGIONS.iter().find_map(|region| {
        let selector = Selector::parse(region).ok()?;
        document.select(&selector).next().map(|el| el.html())
    })
}

fn strip_non_content(html: &str) -> String {
    let document = Html::parse_fragment(html);
    let mut result = html.to_string();

    for tag in NON_CONTENT_TAGS {
        if let Ok(selector) = Selector::parse(tag) {
            for element in document.select(&selector) {
                result = result.replace(&element.html(), "");
            }
        }
    }

    result
}

fn normalize_markdown(markdown: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    for line in markdown.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || lines.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn count(document: &Html, selector: &str) -> usize {
    Selector::parse(selector)
        .map(|sel| document.select(&sel).count())
        .unwrap_or(0)
}
