use std::collections::BTreeSet;

use epub_logging::epub_debug;

use crate::dom::{Element, Fragment};

/// Class/id keywords marking boilerplate containers.
pub const NOISE_KEYWORDS: &[&str] = &[
    "related",
    "more in",
    "you might also like",
    "recommended",
    "continue reading",
    "advertisement",
    "sponsored",
    "comment",
    "bottom",
];

/// Class substrings removed after image resolution.
pub const NOISE_CLASS_FRAGMENTS: &[&str] = &["advert", "recommend", "sponsor"];

/// Paragraphs shorter than this (in characters, after trimming) count as noise.
pub const MIN_TEXT_CHARS: usize = 20;

const CONTAINER_TAGS: &[&str] = &["section", "aside", "div", "footer", "nav", "p"];
const BLOCK_TAGS: &[&str] = &["p", "div"];
const UNWANTED_TAGS: &[&str] = &["script", "style", "iframe", "video", "noscript"];

/// Keyword-based container removal followed by short-fragment removal.
pub fn remove_noise(body: &mut Fragment) {
    let before = count_elements(body);
    body.remove_elements(is_noise_container);
    body.remove_elements(is_short_fragment);
    epub_debug!(
        "noise filter removed {} of {} elements",
        before - count_elements(body),
        before
    );
}

/// Structural cleanup; must run after images are rewritten to local paths.
pub fn clean_structure(body: &mut Fragment) {
    body.remove_elements(|el| el.is("picture") || el.is("source"));
    body.remove_elements(|el| UNWANTED_TAGS.iter().any(|t| el.is(t)));
    body.remove_elements(|el| {
        is_block(el)
            && el.text_content().trim().is_empty()
            && !el.has_descendant(&["img", "video", "audio"])
    });
    body.remove_elements(|el| {
        el.attr("class")
            .is_some_and(|class| NOISE_CLASS_FRAGMENTS.iter().any(|f| class.contains(f)))
    });
}

/// `src` values of every `<img>` still present in the tree.
pub fn referenced_images(body: &Fragment) -> BTreeSet<String> {
    let mut sources = BTreeSet::new();
    body.for_each_element(|el| {
        if el.is("img") {
            if let Some(src) = el.attr("src") {
                sources.insert(src.to_string());
            }
        }
    });
    sources
}

fn is_noise_container(el: &Element) -> bool {
    if !CONTAINER_TAGS.iter().any(|t| el.is(t)) {
        return false;
    }
    let attr_text = format!(
        "{} {}",
        el.attr("class").unwrap_or_default(),
        el.attr("id").unwrap_or_default()
    )
    .to_lowercase();
    NOISE_KEYWORDS.iter().any(|k| attr_text.contains(k))
}

fn is_short_fragment(el: &Element) -> bool {
    is_block(el)
        && el.text_content().trim().chars().count() < MIN_TEXT_CHARS
        && !el.has_descendant(&["img", "video"])
}

fn is_block(el: &Element) -> bool {
    BLOCK_TAGS.iter().any(|t| el.is(t))
}

fn count_elements(body: &Fragment) -> usize {
    let mut count = 0;
    body.for_each_element(|_| count += 1);
    count
}
