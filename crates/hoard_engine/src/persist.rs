use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// A download in progress: bytes go to a hidden sibling of the target and
/// only appear under the final name once [`PartialFile::commit`] renames it.
/// Dropping an uncommitted file deletes the temporary.
pub struct PartialFile {
    file: tokio::fs::File,
    temp_path: TempPath,
    target: PathBuf,
    written: u64,
}

impl PartialFile {
    pub fn create(target: &Path) -> Result<Self, PersistError> {
        let dir = target
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        ensure_output_dir(dir)?;
        let name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".part")
            .tempfile_in(dir)?;
        let (file, temp_path) = temp.into_parts();

        Ok(Self {
            file: tokio::fs::File::from_std(file),
            temp_path,
            target: target.to_path_buf(),
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), PersistError> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub async fn commit(mut self) -> Result<PathBuf, PersistError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        drop(self.file);
        self.temp_path
            .persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(self.target)
    }
}
