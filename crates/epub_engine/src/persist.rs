//! Writing finished books to the output directory.
//!
//! A `.epub` is only ever visible at its final path as a complete archive: the
//! bytes go to a temp file in the same directory, are synced, and the temp file
//! is renamed over any earlier book with the same name. A failed export leaves
//! the previous file, if any, untouched.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not move book into place at {}: {source}", path.display())]
    Replace { path: PathBuf, source: io::Error },
}

/// Create `dir` if needed and check that a file can be created inside it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let output_dir_error = |e: io::Error| PersistError::OutputDir(format!("{}: {e}", dir.display()));
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )))
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(output_dir_error)?
        }
        Err(err) => return Err(output_dir_error(err)),
    }
    NamedTempFile::new_in(dir).map_err(output_dir_error)?;
    Ok(())
}

/// Writes books into one output directory.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Write `content` to `<dir>/<filename>`, replacing an existing book in one rename.
    pub fn write_bytes(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(content)?;
        staged.as_file_mut().sync_all()?;

        staged
            .persist(&target)
            .map_err(|err| PersistError::Replace {
                path: target.clone(),
                source: err.error,
            })?;
        Ok(target)
    }
}
