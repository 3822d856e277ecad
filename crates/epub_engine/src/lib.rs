//! EPUB engine: fetching, extraction, export orchestration and persistence.
mod config;
mod decode;
mod engine;
mod export;
mod extract;
mod fetch;
mod filename;
mod images;
mod persist;
mod raster;
mod types;

pub use config::{
    ConfigError, EngineConfig, ExportOptions, DEFAULT_IMAGE_CONCURRENCY, DEFAULT_LANGUAGE,
};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use engine::EngineHandle;
pub use export::{
    export_article, ChannelProgressSink, ExportError, ExportedBook, Exporter, NoProgress,
    ProgressSink,
};
pub use extract::{Extractor, ReadabilityLikeExtractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::epub_filename;
pub use images::{absolute_url, resolve_images};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use raster::PlaceholderCoverRasterizer;
pub use types::{
    EngineEvent, ExportFailure, ExportOutcome, FailureKind, FetchError, FetchMetadata,
    FetchedResource, JobId, JobProgress, Stage,
};
