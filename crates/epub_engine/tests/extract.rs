use epub_core::{Article, UNKNOWN_AUTHOR, UNTITLED};
use epub_engine::{
    decode_html, DecodeError, Extractor, ReadabilityLikeExtractor, DEFAULT_LANGUAGE,
};
use pretty_assertions::assert_eq;

#[test]
fn reads_article_metadata_and_content() {
    let html = r#"<!DOCTYPE html>
<html lang="en-GB">
<head>
  <title>Site | Field Notes</title>
  <meta property="og:title" content=" Field Notes ">
  <meta name="author" content="Ada Lovelace">
</head>
<body>
  <nav>Home</nav>
  <article><h1>Ignored heading</h1><p>Body text.</p></article>
</body>
</html>"#;
    let extracted = ReadabilityLikeExtractor.extract(html);
    assert_eq!(extracted.title.as_deref(), Some("Field Notes"));
    assert_eq!(extracted.page_title.as_deref(), Some("Site | Field Notes"));
    assert_eq!(extracted.byline.as_deref(), Some("Ada Lovelace"));
    assert_eq!(extracted.language.as_deref(), Some("en-GB"));
    assert_eq!(
        extracted.content_html,
        "<h1>Ignored heading</h1><p>Body text.</p>"
    );
}

#[test]
fn falls_back_to_body_heading_and_byline_markup() {
    let html = r#"<html><head></head><body>
<h1>  Plain   Heading </h1>
<p class="byline">by   Someone</p>
<p>Text.</p>
</body></html>"#;
    let extracted = ReadabilityLikeExtractor.extract(html);
    assert_eq!(extracted.title.as_deref(), Some("Plain Heading"));
    assert_eq!(extracted.page_title, None);
    assert_eq!(extracted.byline.as_deref(), Some("by Someone"));
    assert_eq!(extracted.language, None);
    assert!(extracted.content_html.contains("<p>Text.</p>"));
}

#[test]
fn missing_fields_get_defaults() {
    let extracted = ReadabilityLikeExtractor.extract("<p>only a paragraph</p>");
    let article = Article::from_extracted(extracted, DEFAULT_LANGUAGE);
    assert_eq!(article.title, UNTITLED);
    assert_eq!(article.author, UNKNOWN_AUTHOR);
    assert_eq!(article.language, "zh-CN");
    assert!(article.body_markup.contains("only a paragraph"));
}

#[test]
fn page_title_backs_up_a_missing_article_title() {
    let extracted =
        ReadabilityLikeExtractor.extract("<title>Tab Title</title><p>no headings here</p>");
    let article = Article::from_extracted(extracted, "en");
    assert_eq!(article.title, "Tab Title");
    assert_eq!(article.language, "en");
}

#[test]
fn decode_respects_charset_header() {
    let bytes = b"<title>\xd6\xd0\xce\xc4\xb1\xea\xcc\xe2</title>";
    let decoded = decode_html(bytes, Some("text/html; charset=gbk")).unwrap();
    assert_eq!(decoded.html, "<title>中文标题</title>");
    assert_eq!(decoded.encoding_label, "GBK");
}

#[test]
fn decode_prefers_the_byte_order_mark() {
    let decoded = decode_html(b"\xEF\xBB\xBFhello", Some("text/html; charset=gbk")).unwrap();
    assert_eq!(decoded.html, "hello");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn decode_detects_undeclared_utf8() {
    let text = "<p>Crème brûlée, déjà vu, façade.</p>";
    let decoded = decode_html(text.as_bytes(), Some("text/html")).unwrap();
    assert_eq!(decoded.html, text);
}

#[test]
fn decode_rejects_bytes_invalid_in_the_declared_charset() {
    let err = decode_html(b"ok \xff\xfe\xfd", Some("text/html; charset=utf-8")).unwrap_err();
    assert_eq!(
        err,
        DecodeError::Malformed {
            encoding: "UTF-8".to_string()
        }
    );
}
