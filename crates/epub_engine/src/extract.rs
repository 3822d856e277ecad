use epub_core::ExtractedArticle;
use scraper::{ElementRef, Html, Selector};

/// Content-extraction service: full page HTML in, article parts out.
pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedArticle;
}

/// Lightweight "readability-like" extractor:
/// - content is `<article>` inner_html if present, else `<body>`, else the
///   whole document
/// - title is `og:title`, else the first `<h1>` of the content
/// - page title is `<title>`
/// - byline is `meta[name=author]`, else a `rel=author` link, else `.byline`
///   or `.author` text
/// - language is `html[lang]`.
#[derive(Debug, Default)]
pub struct ReadabilityLikeExtractor;

impl Extractor for ReadabilityLikeExtractor {
    fn extract(&self, html: &str) -> ExtractedArticle {
        let doc = Html::parse_document(html);

        let content = first(&doc, "article").or_else(|| first(&doc, "body"));
        let content_html = content
            .map(|node| node.inner_html())
            .unwrap_or_else(|| doc.root_element().html());

        let title = meta_content(&doc, r#"meta[property="og:title"]"#).or_else(|| {
            let h1 = Selector::parse("h1").ok()?;
            content
                .and_then(|node| node.select(&h1).next())
                .map(text_of)
                .filter(|t| !t.is_empty())
        });

        let page_title = first(&doc, "title")
            .map(text_of)
            .filter(|t| !t.is_empty());

        let byline = meta_content(&doc, r#"meta[name="author"]"#)
            .or_else(|| {
                ["[rel=author]", ".byline", ".author"]
                    .iter()
                    .filter_map(|sel| first(&doc, sel))
                    .map(text_of)
                    .find(|t| !t.is_empty())
            });

        let language = doc
            .root_element()
            .value()
            .attr("lang")
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty());

        ExtractedArticle {
            title,
            page_title,
            byline,
            language,
            content_html,
        }
    }
}

fn first<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next()
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    first(doc, selector)
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn text_of(node: ElementRef<'_>) -> String {
    node.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
