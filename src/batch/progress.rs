use crate::batch::{BatchPhase, SequencingMode};
use crate::error::{PdfSheetError, UserFriendlyError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub total_files: usize,
    /// Files whose outcome is final.
    pub completed: usize,
    pub succeeded: usize,
    pub failed_attempts: usize,
    pub current_file: Option<String>,
    pub start_time: Instant,
    pub errors: Vec<String>,
}

impl BatchProgress {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            completed: 0,
            succeeded: 0,
            failed_attempts: 0,
            current_file: None,
            start_time: Instant::now(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn record_success(&mut self, file_name: &str) {
        self.completed += 1;
        self.succeeded += 1;
        self.current_file = Some(file_name.to_string());
    }

    /// Records a failed attempt; `is_final` marks the file as done.
    pub(crate) fn record_failure(&mut self, failure: &FileFailure, is_final: bool) {
        if is_final {
            self.completed += 1;
        }
        self.failed_attempts += 1;
        self.current_file = Some(failure.file_name.clone());
        self.errors.push(failure.to_string());
    }

    /// Completed share of the batch, from 0.0 to 1.0.
    pub fn fraction(&self) -> f64 {
        if self.total_files == 0 {
            1.0
        } else {
            self.completed as f64 / self.total_files as f64
        }
    }

    pub fn percentage(&self) -> f64 {
        self.fraction() * 100.0
    }

    pub fn is_finished(&self) -> bool {
        self.completed == self.total_files
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn estimated_remaining(&self) -> Duration {
        if self.completed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.elapsed();
        let rate = self.completed as f64 / elapsed.as_secs_f64();
        let remaining_files = self.total_files.saturating_sub(self.completed);

        if rate > 0.0 {
            Duration::from_secs_f64(remaining_files as f64 / rate)
        } else {
            Duration::from_secs(0)
        }
    }
}

/// Why one file produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub category: String,
    pub message: String,
}

impl FileFailure {
    pub fn from_error(file_name: &str, error: &PdfSheetError) -> Self {
        Self {
            file_name: file_name.to_string(),
            category: error.category().to_string(),
            message: error.user_message(),
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.file_name, self.category, self.message)
    }
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Succeeded {
        index: usize,
        file_name: String,
        fields: usize,
    },
    Failed {
        index: usize,
        failure: FileFailure,
    },
}

impl FileOutcome {
    pub fn index(&self) -> usize {
        match self {
            FileOutcome::Succeeded { index, .. } | FileOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            FileOutcome::Succeeded { file_name, .. } => file_name,
            FileOutcome::Failed { failure, .. } => &failure.file_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Succeeded { .. })
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub mode: SequencingMode,
    pub phase: BatchPhase,
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FileFailure>,
    pub columns: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub artifact: Option<PathBuf>,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.phase == BatchPhase::AllComplete
    }
}
