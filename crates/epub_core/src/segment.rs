use crate::dom::{Element, Fragment, Node};
use crate::sanitize::sanitize;

/// Heading element that starts a new chapter.
pub const CHAPTER_HEADING: &str = "h2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub nodes: Vec<Element>,
}

impl Chapter {
    /// Sanitized, newline-joined outer markup of the chapter's nodes.
    pub fn markup(&self) -> String {
        let joined = self
            .nodes
            .iter()
            .map(Element::outer_html)
            .collect::<Vec<_>>()
            .join("\n");
        sanitize(&joined)
    }
}

/// Split the body's direct element children into chapters at each `<h2>`.
///
/// Content before the first heading forms a chapter titled `article_title`.
/// Empty chapters are never emitted.
pub fn split_chapters(body: Fragment, article_title: &str) -> Vec<Chapter> {
    let mut chapters = Vec::new();
    let mut current_title = article_title.to_string();
    let mut current: Vec<Element> = Vec::new();

    for node in body.children {
        let Node::Element(el) = node else {
            continue;
        };
        if el.is(CHAPTER_HEADING) {
            flush(&mut chapters, &current_title, &mut current);
            let heading = el.text_content().trim().to_string();
            current_title = if heading.is_empty() {
                article_title.to_string()
            } else {
                heading
            };
        }
        current.push(el);
    }
    flush(&mut chapters, &current_title, &mut current);
    chapters
}

fn flush(chapters: &mut Vec<Chapter>, title: &str, nodes: &mut Vec<Element>) {
    if nodes.is_empty() {
        return;
    }
    chapters.push(Chapter {
        title: title.to_string(),
        nodes: std::mem::take(nodes),
    });
}
