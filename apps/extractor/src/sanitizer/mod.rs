//! HTML sanitizer: reduces a rendered page to the markup the extraction model needs.
//!
//! Three passes over the document:
//! 1. drop `style`, `script`, `meta`, `header` and `footer` subtrees (streaming rewrite);
//! 2. parse the result and find the related-jobs `<section>` by keyword;
//! 3. rewrite again, removing that one section and every class token that does not
//!    mention "description".
//!
//! Pass 2 runs on the output of pass 1 so text inside stripped elements (inline scripts,
//! footers) can never trigger the related-section match.

use lol_html::errors::RewritingError;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_RELATED_SECTION_KEYWORDS: &[&str] =
    &["Related Jobs", "Recommended Jobs", "Similar Jobs"];

const STRIPPED_TAGS: &[&str] = &["style", "script", "meta", "header", "footer"];

/// Class tokens survive only if they contain this marker.
const KEPT_CLASS_MARKER: &str = "description";

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("HTML rewrite failed: {0}")]
    Rewrite(#[from] RewritingError),
}

#[derive(Debug, Clone)]
pub struct Sanitizer {
    related_keywords: Vec<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_RELATED_SECTION_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        )
    }
}

impl Sanitizer {
    /// Keywords are tried in order; the first one that matches any section wins.
    pub fn new(related_keywords: Vec<String>) -> Self {
        Self { related_keywords }
    }

    pub fn sanitize(&self, html: &str) -> Result<String, SanitizeError> {
        let stripped = strip_elements(html)?;
        let related = self.find_related_section(&stripped);
        if let Some(index) = related {
            debug!("Removing related-jobs section #{index}");
        }
        rewrite_sections_and_classes(&stripped, related)
    }

    /// Returns the document-order index (among all `<section>` elements) of the section to drop.
    fn find_related_section(&self, html: &str) -> Option<usize> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("section").ok()?;
        let section_texts: Vec<String> = document
            .select(&selector)
            .map(|section| section.text().collect::<String>().to_lowercase())
            .collect();

        self.related_keywords.iter().find_map(|keyword| {
            let keyword = keyword.to_lowercase();
            section_texts.iter().position(|text| text.contains(&keyword))
        })
    }
}

/// Sanitizes with the default related-section keywords.
#[cfg(test)]
pub fn sanitize(html: &str) -> Result<String, SanitizeError> {
    Sanitizer::default().sanitize(html)
}

fn strip_elements(html: &str) -> Result<String, SanitizeError> {
    let handlers = STRIPPED_TAGS
        .iter()
        .map(|tag| {
            element!(*tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    Ok(rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            strict: false,
            ..RewriteStrSettings::new()
        },
    )?)
}

fn rewrite_sections_and_classes(
    html: &str,
    related: Option<usize>,
) -> Result<String, SanitizeError> {
    let mut handlers = vec![element!("[class]", |el| {
        let kept = el
            .get_attribute("class")
            .map(|classes| description_classes(&classes))
            .unwrap_or_default();
        if kept.is_empty() {
            el.remove_attribute("class");
        } else {
            el.set_attribute("class", &kept)?;
        }
        Ok(())
    })];

    if let Some(target) = related {
        let mut seen = 0usize;
        handlers.push(element!("section", move |el| {
            if seen == target {
                el.remove();
            }
            seen += 1;
            Ok(())
        }));
    }

    Ok(rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            strict: false,
            ..RewriteStrSettings::new()
        },
    )?)
}

fn description_classes(classes: &str) -> String {
    classes
        .split_ascii_whitespace()
        .filter(|token| token.contains(KEPT_CLASS_MARKER))
        .collect::<Vec<_>>()
        .join(" ")
}
