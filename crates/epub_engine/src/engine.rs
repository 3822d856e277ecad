use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use epub_core::Article;
use epub_logging::{epub_debug, epub_error, epub_info};

use crate::config::EngineConfig;
use crate::decode::decode_html;
use crate::export::{ChannelProgressSink, ExportError, Exporter, ProgressSink};
use crate::extract::{Extractor, ReadabilityLikeExtractor};
use crate::filename::epub_filename;
use crate::persist::AtomicFileWriter;
use crate::{EngineEvent, ExportFailure, ExportOutcome, JobId, JobProgress, Stage};

const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

enum EngineCommand {
    ExportUrl { job_id: JobId, url: String },
    ExportArticle { job_id: JobId, article: Box<Article> },
}

/// Background exporter: jobs go in over a channel, progress and results come
/// back as [`EngineEvent`]s. Each job runs as its own task on a runtime owned
/// by the engine thread.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

struct Worker {
    exporter: Exporter,
    extractor: Arc<dyn Extractor>,
    writer: AtomicFileWriter,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let exporter = Exporter::with_defaults(config.fetch, config.export);
        Self::with_parts(
            exporter,
            Arc::new(ReadabilityLikeExtractor),
            config.output_dir,
        )
    }

    pub fn with_parts(
        exporter: Exporter,
        extractor: Arc<dyn Extractor>,
        output_dir: PathBuf,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = Arc::new(Worker {
            exporter,
            extractor,
            writer: AtomicFileWriter::new(output_dir),
        });

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                let worker = worker.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(worker.as_ref(), command, event_tx).await;
                });
            }
            // Let in-flight jobs finish once every handle is gone.
            runtime.shutdown_timeout(Duration::from_secs(60));
        });

        Self { cmd_tx, event_rx }
    }

    /// Fetch the page at `url`, extract its article and export it.
    pub fn enqueue_url(&self, job_id: JobId, url: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::ExportUrl {
            job_id,
            url: url.into(),
        });
    }

    /// Export an article that was already extracted.
    pub fn enqueue_article(&self, job_id: JobId, article: Article) {
        let _ = self.cmd_tx.send(EngineCommand::ExportArticle {
            job_id,
            article: Box::new(article),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block until the next event arrives or `timeout` passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(worker: &Worker, command: EngineCommand, event_tx: mpsc::Sender<EngineEvent>) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let (job_id, result) = match command {
        EngineCommand::ExportUrl { job_id, url } => {
            sink.emit(progress(job_id, Stage::Queued));
            (job_id, export_url(worker, job_id, &url, &sink).await)
        }
        EngineCommand::ExportArticle { job_id, article } => {
            sink.emit(progress(job_id, Stage::Queued));
            (job_id, export_and_write(worker, job_id, &article, &sink).await)
        }
    };

    let result = result.map_err(|err| {
        epub_error!("job {job_id} failed: {err}");
        ExportFailure {
            stage: err.stage(),
            message: err.to_string(),
        }
    });
    if result.is_ok() {
        sink.emit(progress(job_id, Stage::Done));
    }
    let _ = event_tx.send(EngineEvent::JobCompleted { job_id, result });
}

async fn export_url(
    worker: &Worker,
    job_id: JobId,
    url: &str,
    sink: &dyn ProgressSink,
) -> Result<ExportOutcome, ExportError> {
    sink.emit(progress(job_id, Stage::Extracting));
    let page = worker.exporter.fetcher().fetch(url).await?;
    if !HTML_CONTENT_TYPES.contains(&page.mime_type.as_str()) {
        return Err(ExportError::NotHtml(page.mime_type));
    }
    let decoded = decode_html(&page.bytes, page.content_type.as_deref())?;
    epub_debug!("job {job_id}: page decoded as {}", decoded.encoding_label);
    let extracted = worker.extractor.extract(&decoded.html);
    let article = Article::from_extracted(extracted, &worker.exporter.options().default_language)
        .with_source_url(page.metadata.final_url);
    export_and_write(worker, job_id, &article, sink).await
}

async fn export_and_write(
    worker: &Worker,
    job_id: JobId,
    article: &Article,
    sink: &dyn ProgressSink,
) -> Result<ExportOutcome, ExportError> {
    let book = worker.exporter.export(job_id, article, sink).await?;

    sink.emit(progress(job_id, Stage::Writing));
    let filename = epub_filename(book.title());
    let path = worker.writer.write_bytes(&filename, &book.bytes)?;
    epub_info!("job {job_id}: wrote {}", path.display());

    Ok(ExportOutcome {
        title: book.title().to_string(),
        identifier: book.package.metadata().identifier.clone(),
        chapters: book.package.spine().len(),
        images: book.images,
        images_dropped: book.images_dropped,
        has_cover: book.has_cover(),
        bytes_written: book.bytes.len() as u64,
        output_path: path,
    })
}

fn progress(job_id: JobId, stage: Stage) -> EngineEvent {
    EngineEvent::Progress(JobProgress::stage(job_id, stage))
}
