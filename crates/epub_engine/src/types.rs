use std::fmt;
use std::path::PathBuf;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Extracting,
    Filtering,
    FetchingImages,
    Segmenting,
    RenderingCover,
    Packaging,
    Writing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Queued => "queued",
            Stage::Extracting => "extracting",
            Stage::Filtering => "filtering",
            Stage::FetchingImages => "fetching images",
            Stage::Segmenting => "segmenting",
            Stage::RenderingCover => "rendering cover",
            Stage::Packaging => "packaging",
            Stage::Writing => "writing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub stage: Stage,
    /// Images resolved so far, reported while fetching images.
    pub images_done: Option<usize>,
    pub images_total: Option<usize>,
}

impl JobProgress {
    pub fn stage(job_id: JobId, stage: Stage) -> Self {
        Self {
            job_id,
            stage,
            images_done: None,
            images_total: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(JobProgress),
    JobCompleted {
        job_id: JobId,
        result: Result<ExportOutcome, ExportFailure>,
    },
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub title: String,
    pub identifier: String,
    pub chapters: usize,
    pub images: usize,
    pub images_dropped: usize,
    pub has_cover: bool,
    pub bytes_written: u64,
    pub output_path: PathBuf,
}

/// Why a job failed, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    pub stage: Stage,
    pub message: String,
}

impl fmt::Display for ExportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "export failed while {}: {}", self.stage, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub byte_len: u64,
}

/// A fetched resource. `mime_type` has its parameters stripped; the header as
/// sent, charset included, stays in `content_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub mime_type: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
