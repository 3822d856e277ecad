//! EPUB core: pure article-to-package transformations.
mod article;
mod cover;
mod dom;
mod images;
mod noise;
mod package;
mod sanitize;
mod segment;
mod xml;

pub use article::{Article, ExtractedArticle, UNKNOWN_AUTHOR, UNTITLED};
pub use cover::{
    wrap_text, CoverError, CoverLayout, CoverRasterizer, EstimatedMeasure, FontFamily, FontSpec,
    TextLine, TextMeasure, COVER_HEIGHT, COVER_HREF, COVER_WIDTH, TITLE_MAX_WIDTH,
};
pub use dom::{is_void_element, Element, Fragment, Node, VOID_ELEMENTS};
pub use images::{
    collect_image_sources, image_filename, rewrite_images, DropReason, ImageAsset, ImageMime,
    ImageOutcome, ImageSource, IMAGE_DIR, IMAGE_STYLE,
};
pub use noise::{clean_structure, referenced_images, remove_noise, MIN_TEXT_CHARS, NOISE_KEYWORDS};
pub use package::{
    opf_path, Compression, Manifest, ManifestEntry, NavPoint, Package, PackageEntry,
    PackageError, PackageMetadata, CONTAINER_PATH, COVER_ID, MIMETYPE, MIMETYPE_PATH, NCX_ID,
};
pub use sanitize::{escape_entities, sanitize};
pub use segment::{split_chapters, Chapter, CHAPTER_HEADING};
pub use xml::{XmlDocument, XmlElement, XmlError, XmlNode};
