use std::fmt;

use crate::dom::{Element, Fragment, Node};

/// Directory (relative to the package document) holding image files.
pub const IMAGE_DIR: &str = "images";

/// Inline style applied to every rewritten image.
pub const IMAGE_STYLE: &str = "max-width: 100%; height: auto;";

/// Image types accepted into the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    /// Parse a MIME type, ignoring parameters and case.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        if essence.eq_ignore_ascii_case("image/jpeg") {
            Some(Self::Jpeg)
        } else if essence.eq_ignore_ascii_case("image/png") {
            Some(Self::Png)
        } else {
            None
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// File extension, taken from the MIME subtype.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub original_ref: String,
    pub local_filename: String,
    pub mime: ImageMime,
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn new(index: usize, original_ref: impl Into<String>, mime: ImageMime, bytes: Vec<u8>) -> Self {
        Self {
            original_ref: original_ref.into(),
            local_filename: image_filename(index, mime),
            mime,
            bytes,
        }
    }

    /// Path relative to the package document, as used in `src` and the manifest.
    pub fn href(&self) -> String {
        format!("{IMAGE_DIR}/{}", self.local_filename)
    }
}

pub fn image_filename(index: usize, mime: ImageMime) -> String {
    format!("image_{index}.{}", mime.extension())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MissingSource,
    Fetch(String),
    Unsupported(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingSource => write!(f, "image has no source"),
            DropReason::Fetch(message) => write!(f, "fetch failed: {message}"),
            DropReason::Unsupported(mime) => write!(f, "unsupported image type {mime}"),
        }
    }
}

/// Result of resolving one `<img>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Resolved(ImageAsset),
    Dropped(DropReason),
}

/// An `<img>` found in the body, numbered in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub index: usize,
    pub src: Option<String>,
}

/// Every `<img>` in document order, with `src` (or `data-src`) if present.
pub fn collect_image_sources(body: &Fragment) -> Vec<ImageSource> {
    let mut sources = Vec::new();
    body.for_each_element(|el| {
        if el.is("img") {
            let src = ["src", "data-src"]
                .iter()
                .filter_map(|name| el.attr(name))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(str::to_string);
            sources.push(ImageSource {
                index: sources.len(),
                src,
            });
        }
    });
    sources
}

/// Replace the k-th `<img>` according to `outcomes[k]`: a resolved image becomes a
/// fresh element pointing at its package path, anything else is removed.
///
/// Returns the assets of the resolved images in document order.
pub fn rewrite_images(body: &mut Fragment, outcomes: Vec<ImageOutcome>) -> Vec<ImageAsset> {
    let mut outcomes = outcomes.into_iter();
    let mut assets = Vec::new();
    rewrite_in(&mut body.children, &mut outcomes, &mut assets);
    assets
}

fn rewrite_in(
    nodes: &mut Vec<Node>,
    outcomes: &mut impl Iterator<Item = ImageOutcome>,
    assets: &mut Vec<ImageAsset>,
) {
    let mut rewritten = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            Node::Element(el) if el.is("img") => {
                if let Some(ImageOutcome::Resolved(asset)) = outcomes.next() {
                    rewritten.push(Node::Element(local_image(&asset)));
                    assets.push(asset);
                }
            }
            Node::Element(mut el) => {
                rewrite_in(&mut el.children, outcomes, assets);
                rewritten.push(Node::Element(el));
            }
            text => rewritten.push(text),
        }
    }
    *nodes = rewritten;
}

fn local_image(asset: &ImageAsset) -> Element {
    Element::new("img")
        .with_attr("src", asset.href())
        .with_attr("alt", "")
        .with_attr("style", IMAGE_STYLE)
}
