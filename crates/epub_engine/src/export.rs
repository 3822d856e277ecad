//! Article-to-EPUB orchestration.
//!
//! Stages run strictly in order: noise removal, image resolution and rewrite,
//! structural cleanup, chapter segmentation, cover rendering, then package
//! assembly. An article that filters down to nothing and a packaging error
//! are fatal; lost images and a missing cover are logged and skipped.

use std::sync::Arc;

use epub_core::{
    clean_structure, collect_image_sources, referenced_images, remove_noise, rewrite_images,
    split_chapters, Article, CoverLayout, CoverRasterizer, EstimatedMeasure, Fragment,
    ImageOutcome, Package, PackageError, PackageMetadata, TextMeasure, COVER_ID,
};
use epub_logging::{epub_debug, epub_info, epub_warn};
use thiserror::Error;
use uuid::Uuid;

use crate::config::ExportOptions;
use crate::decode::DecodeError;
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::images::resolve_images;
use crate::persist::PersistError;
use crate::raster::PlaceholderCoverRasterizer;
use crate::{EngineEvent, FetchError, JobId, JobProgress, Stage};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Discards all progress.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: EngineEvent) {}
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("page fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("page is not html: {0}")]
    NotHtml(String),
    #[error("page decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("article has no content left after filtering")]
    NoContent,
    #[error("package error: {0}")]
    Package(#[from] PackageError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

impl ExportError {
    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            ExportError::Fetch(_) | ExportError::NotHtml(_) | ExportError::Decode(_) => {
                Stage::Extracting
            }
            ExportError::NoContent => Stage::Segmenting,
            ExportError::Package(_) => Stage::Packaging,
            ExportError::Persist(_) => Stage::Writing,
        }
    }
}

/// A serialized book plus what went into it.
#[derive(Debug, Clone)]
pub struct ExportedBook {
    pub package: Package,
    pub bytes: Vec<u8>,
    /// Images embedded in the book, cover excluded.
    pub images: usize,
    pub images_dropped: usize,
}

impl ExportedBook {
    pub fn title(&self) -> &str {
        &self.package.metadata().title
    }

    pub fn has_cover(&self) -> bool {
        self.package.manifest().get(COVER_ID).is_some()
    }
}

/// Runs the export pipeline against pluggable collaborators.
#[derive(Clone)]
pub struct Exporter {
    fetcher: Arc<dyn Fetcher>,
    rasterizer: Arc<dyn CoverRasterizer>,
    measure: Arc<dyn TextMeasure>,
    options: ExportOptions,
}

impl Exporter {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        rasterizer: Arc<dyn CoverRasterizer>,
        options: ExportOptions,
    ) -> Self {
        Self {
            fetcher,
            rasterizer,
            measure: Arc::new(EstimatedMeasure),
            options,
        }
    }

    /// HTTP fetching and the placeholder cover.
    pub fn with_defaults(settings: FetchSettings, options: ExportOptions) -> Self {
        Self::new(
            Arc::new(ReqwestFetcher::new(settings)),
            Arc::new(PlaceholderCoverRasterizer::default()),
            options,
        )
    }

    /// Text measurement used for cover line wrapping.
    pub fn with_measure(mut self, measure: Arc<dyn TextMeasure>) -> Self {
        self.measure = measure;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub async fn export(
        &self,
        job_id: JobId,
        article: &Article,
        sink: &dyn ProgressSink,
    ) -> Result<ExportedBook, ExportError> {
        let progress = |stage| sink.emit(EngineEvent::Progress(JobProgress::stage(job_id, stage)));

        progress(Stage::Filtering);
        let mut body = Fragment::parse(&article.body_markup);
        remove_noise(&mut body);

        let sources = collect_image_sources(&body);
        let total = sources.len();
        sink.emit(EngineEvent::Progress(JobProgress {
            job_id,
            stage: Stage::FetchingImages,
            images_done: Some(0),
            images_total: Some(total),
        }));
        let outcomes = resolve_images(
            self.fetcher.as_ref(),
            sources,
            article.source_url.as_deref(),
            self.options.image_concurrency,
        )
        .await;
        let images_dropped = outcomes
            .iter()
            .filter(|o| matches!(o, ImageOutcome::Dropped(_)))
            .count();
        sink.emit(EngineEvent::Progress(JobProgress {
            job_id,
            stage: Stage::FetchingImages,
            images_done: Some(total),
            images_total: Some(total),
        }));

        let mut images = rewrite_images(&mut body, outcomes);
        clean_structure(&mut body);
        let referenced = referenced_images(&body);
        images.retain(|asset| referenced.contains(&asset.href()));

        progress(Stage::Segmenting);
        let chapters = split_chapters(body, &article.title);
        if chapters.is_empty() {
            return Err(ExportError::NoContent);
        }
        epub_debug!("job {job_id}: {} chapters", chapters.len());

        progress(Stage::RenderingCover);
        let layout = CoverLayout::new(&article.title, &article.author, self.measure.as_ref());
        let cover = match self.rasterizer.rasterize(&layout) {
            Ok(jpeg) => Some(jpeg),
            Err(err) => {
                epub_warn!("job {job_id}: continuing without cover: {err}");
                None
            }
        };

        progress(Stage::Packaging);
        let identifier = format!("urn:uuid:{}", Uuid::new_v4());
        let metadata = PackageMetadata::for_article(article, identifier);
        let package = Package::assemble(metadata, &chapters, &images, cover)?;
        let bytes = package.to_bytes()?;

        epub_info!(
            "job {job_id}: exported \"{}\" ({} chapters, {} images, {} dropped, {} bytes)",
            article.title,
            chapters.len(),
            images.len(),
            images_dropped,
            bytes.len()
        );

        Ok(ExportedBook {
            package,
            bytes,
            images: images.len(),
            images_dropped,
        })
    }
}

/// Export `article` with the given collaborators and no progress reporting.
pub async fn export_article(
    article: &Article,
    fetcher: Arc<dyn Fetcher>,
    rasterizer: Arc<dyn CoverRasterizer>,
    options: ExportOptions,
) -> Result<ExportedBook, ExportError> {
    Exporter::new(fetcher, rasterizer, options)
        .export(0, article, &NoProgress)
        .await
}
