//! EPUB 2 package assembly.
//!
//! [`Package::assemble`] folds chapters, images and the cover into archive
//! entries plus the manifest, spine and navigation index that describe them.
//! The package is immutable afterwards; [`Package::write_to`] serializes it.

use std::collections::HashSet;
use std::io::{Cursor, Seek, Write};

use epub_logging::epub_debug;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::article::Article;
use crate::cover::COVER_HREF;
use crate::images::ImageAsset;
use crate::segment::Chapter;
use crate::xml::{XmlDocument, XmlElement, XmlError};

pub const MIMETYPE: &str = "application/epub+zip";
pub const MIMETYPE_PATH: &str = "mimetype";
pub const CONTAINER_PATH: &str = "META-INF/container.xml";
pub const CONTENT_DIR: &str = "OEBPS";
pub const OPF_FILENAME: &str = "content.opf";
pub const NCX_FILENAME: &str = "toc.ncx";
pub const NCX_ID: &str = "ncx";
pub const COVER_ID: &str = "cover";
pub const BOOK_ID: &str = "bookid";

pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";
pub const OPF_MEDIA_TYPE: &str = "application/oebps-package+xml";
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

const CONTAINER_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:container";
const OPF_NS: &str = "http://www.idpf.org/2007/opf";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const NCX_NS: &str = "http://www.daisy.org/z3986/2005/ncx/";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const NCX_DOCTYPE: &str =
    r#"ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd""#;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("duplicate manifest id {0}")]
    DuplicateId(String),
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: String,
    pub author: String,
    pub language: String,
    pub identifier: String,
}

impl PackageMetadata {
    pub fn for_article(article: &Article, identifier: impl Into<String>) -> Self {
        Self {
            title: article.title.clone(),
            author: article.author.clone(),
            language: article.language.clone(),
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestEntry {
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }

    fn to_xml(&self) -> XmlElement {
        let item = XmlElement::new("item")
            .attr("id", &self.id)
            .attr("href", &self.href)
            .attr("media-type", &self.media_type);
        match &self.properties {
            Some(properties) => item.attr("properties", properties),
            None => item,
        }
    }
}

/// Manifest items in insertion order; ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    ids: HashSet<String>,
}

impl Manifest {
    pub fn insert(&mut self, entry: ManifestEntry) -> Result<(), PackageError> {
        if !self.ids.insert(entry.id.clone()) {
            return Err(PackageError::DuplicateId(entry.id));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub id: String,
    pub play_order: usize,
    pub label: String,
    pub src: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Stored,
    Deflated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub compression: Compression,
}

impl PackageEntry {
    fn deflated(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            compression: Compression::Deflated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    metadata: PackageMetadata,
    manifest: Manifest,
    spine: Vec<String>,
    nav_points: Vec<NavPoint>,
    entries: Vec<PackageEntry>,
}

impl Package {
    /// Build every archive entry for the given chapters, images and cover.
    ///
    /// `cover_jpeg` is optional: without it the cover item and cover meta are left out.
    pub fn assemble(
        metadata: PackageMetadata,
        chapters: &[Chapter],
        images: &[ImageAsset],
        cover_jpeg: Option<Vec<u8>>,
    ) -> Result<Self, PackageError> {
        let mut manifest = Manifest::default();
        let mut spine = Vec::with_capacity(chapters.len());
        let mut nav_points = Vec::with_capacity(chapters.len());
        let mut content = Vec::with_capacity(chapters.len() + images.len() + 1);

        let has_cover = cover_jpeg.is_some();
        if let Some(jpeg) = cover_jpeg {
            manifest.insert(
                ManifestEntry::new(COVER_ID, COVER_HREF, JPEG_MEDIA_TYPE)
                    .with_properties("cover-image"),
            )?;
            content.push(PackageEntry::deflated(content_path(COVER_HREF), jpeg));
        }

        for (i, chapter) in chapters.iter().enumerate() {
            let id = format!("chap{i}");
            let href = format!("chapter_{i}.html");
            let xhtml = chapter_document(&chapter.title, &chapter.markup()).to_xml()?;
            content.push(PackageEntry::deflated(content_path(&href), xhtml));
            manifest.insert(ManifestEntry::new(&id, &href, XHTML_MEDIA_TYPE))?;
            nav_points.push(NavPoint {
                id: format!("navPoint-{}", i + 1),
                play_order: i + 1,
                label: chapter.title.clone(),
                src: href,
            });
            spine.push(id);
        }

        for image in images {
            let href = image.href();
            manifest.insert(ManifestEntry::new(
                &image.local_filename,
                &href,
                image.mime.media_type(),
            ))?;
            content.push(PackageEntry::deflated(content_path(&href), image.bytes.clone()));
        }

        manifest.insert(ManifestEntry::new(NCX_ID, NCX_FILENAME, NCX_MEDIA_TYPE))?;

        let opf = package_document(&metadata, &manifest, &spine, has_cover).to_xml()?;
        let ncx = navigation_document(&metadata, &nav_points).to_xml()?;

        let mut entries = Vec::with_capacity(content.len() + 4);
        entries.push(PackageEntry {
            path: MIMETYPE_PATH.to_string(),
            data: MIMETYPE.as_bytes().to_vec(),
            compression: Compression::Stored,
        });
        entries.push(PackageEntry::deflated(
            CONTAINER_PATH,
            container_document().to_xml()?,
        ));
        entries.push(PackageEntry::deflated(opf_path(), opf));
        entries.push(PackageEntry::deflated(content_path(NCX_FILENAME), ncx));
        entries.extend(content);

        epub_debug!(
            "assembled package {} with {} chapters, {} images, {} entries",
            metadata.identifier,
            chapters.len(),
            images.len(),
            entries.len()
        );

        Ok(Self {
            metadata,
            manifest,
            spine,
            nav_points,
            entries,
        })
    }

    pub fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Manifest ids of the chapters in reading order.
    pub fn spine(&self) -> &[String] {
        &self.spine
    }

    pub fn nav_points(&self) -> &[NavPoint] {
        &self.nav_points
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn entry(&self, path: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Write the zip container; `mimetype` is the first entry and stored uncompressed.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, PackageError> {
        let mut zip = ZipWriter::new(writer);
        for entry in &self.entries {
            let method = match entry.compression {
                Compression::Stored => CompressionMethod::Stored,
                Compression::Deflated => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(entry.path.as_str(), options)?;
            zip.write_all(&entry.data)?;
        }
        Ok(zip.finish()?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PackageError> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }
}

pub fn opf_path() -> String {
    content_path(OPF_FILENAME)
}

fn content_path(href: &str) -> String {
    format!("{CONTENT_DIR}/{href}")
}

fn container_document() -> XmlDocument {
    XmlDocument::new(
        XmlElement::new("container")
            .attr("version", "1.0")
            .attr("xmlns", CONTAINER_NS)
            .child(
                XmlElement::new("rootfiles").child(
                    XmlElement::new("rootfile")
                        .attr("full-path", opf_path())
                        .attr("media-type", OPF_MEDIA_TYPE),
                ),
            ),
    )
}

fn chapter_document(title: &str, body_markup: &str) -> XmlDocument {
    XmlDocument::new(
        XmlElement::new("html")
            .attr("xmlns", XHTML_NS)
            .child(XmlElement::new("head").child(XmlElement::new("title").text(title)))
            .child(
                XmlElement::new("body")
                    .child(XmlElement::new("h2").text(title))
                    .raw(format!("\n{body_markup}\n")),
            ),
    )
}

fn package_document(
    metadata: &PackageMetadata,
    manifest: &Manifest,
    spine: &[String],
    has_cover: bool,
) -> XmlDocument {
    let mut meta = XmlElement::new("metadata")
        .attr("xmlns:dc", DC_NS)
        .attr("xmlns:opf", OPF_NS)
        .child(XmlElement::new("dc:title").text(&metadata.title))
        .child(XmlElement::new("dc:creator").text(&metadata.author))
        .child(XmlElement::new("dc:language").text(&metadata.language))
        .child(
            XmlElement::new("dc:identifier")
                .attr("id", BOOK_ID)
                .text(&metadata.identifier),
        );
    if has_cover {
        meta = meta.child(
            XmlElement::new("meta")
                .attr("name", "cover")
                .attr("content", COVER_ID),
        );
    }

    XmlDocument::new(
        XmlElement::new("package")
            .attr("version", "2.0")
            .attr("xmlns", OPF_NS)
            .attr("unique-identifier", BOOK_ID)
            .child(meta)
            .child(
                XmlElement::new("manifest")
                    .children(manifest.entries().iter().map(ManifestEntry::to_xml)),
            )
            .child(
                XmlElement::new("spine").attr("toc", NCX_ID).children(
                    spine
                        .iter()
                        .map(|id| XmlElement::new("itemref").attr("idref", id)),
                ),
            ),
    )
}

fn navigation_document(metadata: &PackageMetadata, nav_points: &[NavPoint]) -> XmlDocument {
    let head = XmlElement::new("head")
        .child(ncx_meta("dtb:uid", &metadata.identifier))
        .child(ncx_meta("dtb:depth", "1"))
        .child(ncx_meta("dtb:totalPageCount", "0"))
        .child(ncx_meta("dtb:maxPageNumber", "0"));

    let nav_map = XmlElement::new("navMap").children(nav_points.iter().map(|point| {
        XmlElement::new("navPoint")
            .attr("id", &point.id)
            .attr("playOrder", point.play_order.to_string())
            .child(XmlElement::new("navLabel").child(XmlElement::new("text").text(&point.label)))
            .child(XmlElement::new("content").attr("src", &point.src))
    }));

    XmlDocument::new(
        XmlElement::new("ncx")
            .attr("xmlns", NCX_NS)
            .attr("version", "2005-1")
            .child(head)
            .child(XmlElement::new("docTitle").child(XmlElement::new("text").text(&metadata.title)))
            .child(
                XmlElement::new("docAuthor").child(XmlElement::new("text").text(&metadata.author)),
            )
            .child(nav_map),
    )
    .with_doctype(NCX_DOCTYPE)
}

fn ncx_meta(name: &str, content: &str) -> XmlElement {
    XmlElement::new("meta")
        .attr("name", name)
        .attr("content", content)
}
