use crate::error::{PdfSheetError, Result, StageError};
use crate::remote::UploadedFile;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Where the bytes of a submitted file come from.
#[derive(Debug, Clone)]
pub enum FileOrigin {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A file submitted to a batch.
///
/// Keeps the origin rather than an open stream, so every attempt reads the
/// content afresh.
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    name: String,
    origin: FileOrigin,
}

impl SubmittedFile {
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| PdfSheetError::InvalidInput {
                path: path.display().to_string(),
                reason: "file name is empty or not valid UTF-8".to_string(),
            })?
            .to_string();

        Ok(Self {
            name,
            origin: FileOrigin::Path(path),
        })
    }

    pub fn from_bytes<N: Into<String>, B: Into<Arc<[u8]>>>(name: N, bytes: B) -> Self {
        Self {
            name: name.into(),
            origin: FileOrigin::Memory(bytes.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &FileOrigin {
        &self.origin
    }

    /// Opens a fresh, single-use handle to the content.
    pub async fn open(&self) -> std::result::Result<UploadedFile, StageError> {
        match &self.origin {
            FileOrigin::Path(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| StageError::new("OpenFailed", format!("{}: {}", path.display(), e)))?;
                let size = file
                    .metadata()
                    .await
                    .map_err(|e| StageError::new("OpenFailed", format!("{}: {}", path.display(), e)))?
                    .len();
                Ok(UploadedFile::new(self.name.clone(), size, file))
            }
            FileOrigin::Memory(bytes) => Ok(UploadedFile::new(
                self.name.clone(),
                bytes.len() as u64,
                Cursor::new(bytes.clone()),
            )),
        }
    }
}

/// Expands files and directories into the list of files to submit.
///
/// Directories contribute the `*.pdf` files below them, sorted by path.
/// A path given twice is submitted once.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<SubmittedFile>> {
    let mut seen_paths = HashSet::new();
    let mut seen_names = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        if !input.exists() {
            return Err(PdfSheetError::InvalidInput {
                path: input.display().to_string(),
                reason: "no such file or directory".to_string(),
            });
        }

        let candidates = if input.is_dir() {
            pdfs_in_directory(input)
        } else {
            if !is_pdf(input) {
                log::warn!("{} does not have a .pdf extension", input.display());
            }
            vec![input.clone()]
        };

        for path in candidates {
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen_paths.insert(key) {
                log::debug!("skipping duplicate input {}", path.display());
                continue;
            }

            let file = SubmittedFile::from_path(path)?;
            if !seen_names.insert(file.name().to_string()) {
                log::warn!(
                    "more than one input is named {}; they share a bucket key and are processed one after another",
                    file.name()
                );
            }
            files.push(file);
        }
    }

    if files.is_empty() {
        return Err(PdfSheetError::NoInputFiles {
            inputs: inputs.iter().map(|p| p.display().to_string()).collect(),
        });
    }

    Ok(files)
}

fn pdfs_in_directory(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
