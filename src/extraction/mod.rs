//! Article body/metadata extraction oracle, grounded on the teacher's
//! `scraping/rust_scraper/clean.rs` (readability → html2md primary pass) and
//! `metadata.rs` (whatlang language detection), generalized to the original
//! `article_extractor.py`'s contract: a primary extractor, a stripper
//! fallback when it yields nothing, and strict ISO 639-1 language validation.

use readability::extractor;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::warn;
use url::Url;
use whatlang::{detect, Lang};

use crate::core::types::ExtractedContent;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

pub struct ArticleExtractor;

impl ArticleExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract `ExtractedContent` from raw HTML fetched from `url`.
    pub fn extract(&self, html: &str, url: &str) -> Result<ExtractedContent, ExtractionError> {
        let base =
            Url::parse(url).map_err(|_| ExtractionError::InvalidUrl(url.to_string()))?;

        let document = Html::parse_document(html);

        let mut cleaned_text = primary_extract(html, &base);
        if cleaned_text.trim().is_empty() {
            cleaned_text = stripper_fallback(html);
        }

        let meta_lang = extract_and_validate_lang(&document, &cleaned_text);
        let meta_keywords = extract_meta(&document, "meta[name=\"keywords\"]");
        let authors = extract_authors(&document);
        let top_image = extract_og_image(&document, &base);

        Ok(ExtractedContent {
            cleaned_text,
            meta_lang,
            meta_keywords,
            authors,
            top_image,
        })
    }
}

impl Default for ArticleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Primary extraction path: Mozilla-readability-style main-content detection,
/// converted from HTML to plain(ish) text via `html2md`.
fn primary_extract(html: &str, base: &Url) -> String {
    match extractor::extract(&mut html.as_bytes(), base) {
        Ok(product) => html2md::parse_html(&product.content),
        Err(e) => {
            warn!(error = %e, "readability extraction failed, falling back to stripper");
            String::new()
        }
    }
}

/// Fallback extraction when the primary extractor yields no text: parse the
/// HTML, drop comments/script/style subtrees, join remaining visible text
/// nodes with a space, collapse whitespace runs. Mirrors the original's
/// BeautifulSoup-based `_alternate_content_extraction`.
fn stripper_fallback(html: &str) -> String {
    let document = Html::parse_document(html);
    let skip = Selector::parse("script, style").unwrap();
    let skip_ancestors: std::collections::HashSet<_> =
        document.select(&skip).map(|e| e.id()).collect();

    let mut text_parts = Vec::new();
    for node in document.root_element().descendants() {
        if let Some(text_node) = node.value().as_text() {
            let is_within_skipped = node
                .ancestors()
                .any(|a| skip_ancestors.contains(&a.id()));
            if !is_within_skipped {
                let t = text_node.trim();
                if !t.is_empty() {
                    text_parts.push(t.to_string());
                }
            }
        }
    }

    let joined = text_parts.join(" ");
    WHITESPACE_RUN.replace_all(&joined, " ").trim().to_string()
}

fn extract_meta(document: &Html, selector: &str) -> String {
    Selector::parse(selector)
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();
    for selector in ["meta[name=\"author\"]", "meta[property=\"article:author\"]"] {
        if let Ok(sel) = Selector::parse(selector) {
            for el in document.select(&sel) {
                if let Some(content) = el.value().attr("content") {
                    let trimmed = content.trim();
                    if !trimmed.is_empty() && !authors.iter().any(|a: &String| a == trimmed) {
                        authors.push(trimmed.to_string());
                    }
                }
            }
        }
    }
    authors
}

fn extract_og_image(document: &Html, base: &Url) -> Option<String> {
    let sel = Selector::parse("meta[property=\"og:image\"]").ok()?;
    let content = document.select(&sel).next()?.value().attr("content")?;
    base.join(content)
        .ok()
        .map(|u| u.to_string())
        .or_else(|| Some(content.to_string()))
}

/// Try `<html lang="...">` first, normalized to ISO 639-1; fall back to
/// whatlang content-based detection on the extracted body text. Any code
/// that doesn't normalize to a two-letter alpha code becomes `None`.
fn extract_and_validate_lang(document: &Html, cleaned_text: &str) -> Option<String> {
    if let Ok(sel) = Selector::parse("html") {
        if let Some(el) = document.select(&sel).next() {
            if let Some(lang) = el.value().attr("lang") {
                if let Some(code) = normalize_lang_code(lang) {
                    return Some(code);
                }
            }
        }
    }

    if cleaned_text.trim().len() < 20 {
        return None;
    }

    detect(cleaned_text).and_then(|info| lang_to_iso639_1(info.lang()))
}

/// `"en-US"` / `"en_GB"` / `"EN"` → `Some("en")`; anything that doesn't reduce
/// to two alphabetic characters → `None`.
fn normalize_lang_code(raw: &str) -> Option<String> {
    let primary = raw.split(['-', '_']).next()?.to_ascii_lowercase();
    if primary.len() == 2 && primary.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(primary)
    } else {
        None
    }
}

fn lang_to_iso639_1(lang: Lang) -> Option<String> {
    let code = match lang {
        Lang::Eng => "en",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Rus => "ru",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Cmn => "zh",
        Lang::Nld => "nl",
        Lang::Pol => "pl",
        Lang::Swe => "sv",
        Lang::Tur => "tr",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        _ => return None,
    };
    Some(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lang_code_handles_locale_suffix() {
        assert_eq!(normalize_lang_code("en-US"), Some("en".to_string()));
        assert_eq!(normalize_lang_code("EN_gb"), Some("en".to_string()));
        assert_eq!(normalize_lang_code("eng"), None);
        assert_eq!(normalize_lang_code(""), None);
    }

    #[test]
    fn extract_falls_back_to_stripper_when_readability_yields_nothing() {
        let extractor = ArticleExtractor::new();
        let html = "<html><head><script>var x=1;</script></head><body><div>Just some plain content here with enough words to not be trivially empty in most heuristics.</div></body></html>";
        let result = extractor.extract(html, "https://example.com/article").unwrap();
        assert!(!result.cleaned_text.is_empty());
        assert!(!result.cleaned_text.contains("var x"));
    }

    #[test]
    fn extract_picks_up_authors_and_keywords() {
        let extractor = ArticleExtractor::new();
        let html = r#"<html><head>
            <meta name="author" content="Jane Doe">
            <meta name="keywords" content="news politics economy">
        </head><body><article><p>Enough text content to survive extraction passes comfortably here.</p></article></body></html>"#;
        let result = extractor.extract(html, "https://example.com/a").unwrap();
        assert_eq!(result.authors, vec!["Jane Doe".to_string()]);
        assert_eq!(result.meta_keywords, "news politics economy");
    }
}
