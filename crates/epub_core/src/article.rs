pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const UNTITLED: &str = "Untitled";

/// What the content-extraction service hands back for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedArticle {
    /// Title of the article itself, if the extractor found one.
    pub title: Option<String>,
    /// The page's `<title>`, used when the article title is missing.
    pub page_title: Option<String>,
    pub byline: Option<String>,
    pub language: Option<String>,
    pub content_html: String,
}

/// Immutable input to the export pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub author: String,
    pub language: String,
    pub body_markup: String,
    /// Page URL; relative image references resolve against it.
    pub source_url: Option<String>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        language: impl Into<String>,
        body_markup: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            language: language.into(),
            body_markup: body_markup.into(),
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Apply the missing-field defaults to an extraction result.
    pub fn from_extracted(extracted: ExtractedArticle, default_language: &str) -> Self {
        let title = non_blank(extracted.title)
            .or_else(|| non_blank(extracted.page_title))
            .unwrap_or_else(|| UNTITLED.to_string());
        let author = non_blank(extracted.byline).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        let language =
            non_blank(extracted.language).unwrap_or_else(|| default_language.to_string());
        Self::new(title, author, language, extracted.content_html)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
