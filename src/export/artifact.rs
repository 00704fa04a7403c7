use crate::batch::BatchReport;
use crate::config::OutputConfig;
use crate::error::{PdfSheetError, Result};
use crate::export::export;
use crate::record::ResultSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the run report written next to the workbook.
pub const REPORT_SUFFIX: &str = "report.json";

/// Writes the exported workbook, and optionally the run report, to disk.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    path: PathBuf,
    force_overwrite: bool,
    write_report: bool,
}

impl ArtifactWriter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            force_overwrite: false,
            write_report: false,
        }
    }

    /// Resolves the artifact path for a batch of `file_count` files.
    ///
    /// An explicit path wins; otherwise the single-file or batch name is
    /// used inside the output directory.
    pub fn from_config(output: &OutputConfig, explicit: Option<&Path>, file_count: usize) -> Self {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => output.directory.join(default_file_name(output, file_count)),
        };
        Self::new(path).with_report(output.write_report)
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn with_report(mut self, write_report: bool) -> Self {
        self.write_report = write_report;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<stem>.report.json` next to the workbook.
    pub fn report_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "pdfsheet".to_string());
        self.path.with_file_name(format!("{}.{}", stem, REPORT_SUFFIX))
    }

    /// Fails when the workbook would replace an existing file.
    pub fn check(&self) -> Result<()> {
        if self.path.is_dir() {
            return Err(PdfSheetError::Export {
                message: format!("{} is a directory", self.path.display()),
            });
        }
        if self.path.exists() && !self.force_overwrite {
            return Err(PdfSheetError::OutputExists {
                path: self.path.display().to_string(),
            });
        }
        Ok(())
    }

    /// Exports `results` and writes the workbook, returning its path.
    pub fn write(&self, results: &ResultSet, report: &BatchReport) -> Result<PathBuf> {
        self.check()?;

        let bytes = export(results)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &bytes)?;
        log::info!("wrote {} ({} bytes)", self.path.display(), bytes.len());

        if self.write_report {
            let mut report = report.clone();
            report.artifact = Some(self.path.clone());
            let json = serde_json::to_string_pretty(&report).map_err(|e| PdfSheetError::Export {
                message: format!("Failed to serialize report to JSON: {}", e),
            })?;
            let report_path = self.report_path();
            fs::write(&report_path, json)?;
            log::info!("wrote {}", report_path.display());
        }

        Ok(self.path.clone())
    }
}

/// Name of the workbook when no explicit path is given.
pub fn default_file_name(output: &OutputConfig, file_count: usize) -> &str {
    if file_count == 1 {
        &output.single_file_name
    } else {
        &output.batch_file_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchPhase, SequencingMode};
    use chrono::Utc;
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;

    fn report() -> BatchReport {
        BatchReport {
            mode: SequencingMode::AllAtOnce,
            phase: BatchPhase::AllComplete,
            total_files: 0,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            columns: Vec::new(),
            started_at: Utc::now(),
            duration: Duration::from_millis(5),
            artifact: None,
        }
    }

    #[test]
    fn test_default_names() {
        let temp_dir = TempDir::new().unwrap();
        let mut output = OutputConfig::default();
        output.directory = temp_dir.path().to_path_buf();

        let single = ArtifactWriter::from_config(&output, None, 1);
        assert_eq!(single.path(), temp_dir.path().join("extracted_info.xlsx"));

        let batch = ArtifactWriter::from_config(&output, None, 3);
        assert_eq!(batch.path(), temp_dir.path().join("combined_results.xlsx"));

        let explicit = ArtifactWriter::from_config(&output, Some(Path::new("out/mine.xlsx")), 3);
        assert_eq!(explicit.path(), Path::new("out/mine.xlsx"));
        assert_eq!(explicit.report_path(), Path::new("out/mine.report.json"));
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("combined_results.xlsx");
        fs::write(&path, b"existing").unwrap();

        let writer = ArtifactWriter::new(&path);
        let result = writer.write(&ResultSet::new(), &report());
        assert!(matches!(result, Err(PdfSheetError::OutputExists { .. })));
        assert_eq!(fs::read(&path).unwrap(), b"existing".to_vec());

        let written = writer
            .with_force_overwrite(true)
            .write(&ResultSet::new(), &report())
            .unwrap();
        assert_eq!(written, path);
        assert_ne!(fs::read(&path).unwrap(), b"existing".to_vec());
    }

    #[test]
    fn test_writes_report_next_to_workbook() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("results.xlsx");

        let writer = ArtifactWriter::new(&path).with_report(true);
        writer.write(&ResultSet::new(), &report()).unwrap();

        assert!(path.exists());
        let json: Value =
            serde_json::from_str(&fs::read_to_string(writer.report_path()).unwrap()).unwrap();
        assert_eq!(json["phase"], "all_complete");
        assert_eq!(json["mode"], "all-at-once");
        assert_eq!(json["artifact"], path.display().to_string());
    }
}
