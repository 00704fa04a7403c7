use crate::batch::{BatchProgress, BatchReport, FileFailure, FileOutcome, SequencingMode, SubmittedFile};
use crate::config::Config;
use crate::error::{PdfSheetError, Result};
use crate::record::{FlatRecord, Flattener, ResultSet};
use crate::remote::{ExtractionClient, ExtractionFunction, ObjectStore, StagingUploader};
use chrono::{DateTime, Utc};
use futures::{future, stream, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Idle,
    BatchSubmitted,
    Processing,
    AllComplete,
    PartiallyComplete,
}

/// Files, cursor and accumulated records of the current batch.
#[derive(Debug)]
pub struct BatchState {
    files: Vec<SubmittedFile>,
    mode: SequencingMode,
    cursor: Option<usize>,
    results: ResultSet,
    failures: Vec<FileFailure>,
    progress: BatchProgress,
    phase: BatchPhase,
    started_at: DateTime<Utc>,
}

impl Default for BatchState {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            mode: SequencingMode::AllAtOnce,
            cursor: None,
            results: ResultSet::new(),
            failures: Vec::new(),
            progress: BatchProgress::new(0),
            phase: BatchPhase::Idle,
            started_at: Utc::now(),
        }
    }
}

impl BatchState {
    fn submitted(files: Vec<SubmittedFile>, mode: SequencingMode) -> Self {
        let total = files.len();
        Self {
            files,
            mode,
            cursor: match mode {
                SequencingMode::OneAtATime => Some(0),
                SequencingMode::AllAtOnce => None,
            },
            results: ResultSet::new(),
            failures: Vec::new(),
            progress: BatchProgress::new(total),
            phase: BatchPhase::BatchSubmitted,
            started_at: Utc::now(),
        }
    }

    fn close(&mut self) {
        self.phase = if self.progress.is_finished() && self.results.len() == self.files.len() {
            BatchPhase::AllComplete
        } else {
            BatchPhase::PartiallyComplete
        };
    }
}

/// Stage, invoke and flatten for a single file.
struct FilePipeline<S, F> {
    uploader: StagingUploader<S>,
    client: ExtractionClient<F>,
    flattener: Flattener,
    bucket: String,
}

impl<S: ObjectStore, F: ExtractionFunction> FilePipeline<S, F> {
    async fn process(&self, file: &SubmittedFile) -> Result<FlatRecord> {
        let name = file.name();

        let upload = file.open().await.map_err(|source| PdfSheetError::Stage {
            file: name.to_string(),
            source,
        })?;
        self.uploader
            .stage(upload, &self.bucket)
            .await
            .map_err(|source| PdfSheetError::Stage {
                file: name.to_string(),
                source,
            })?;

        let document = self
            .client
            .invoke(name)
            .await
            .map_err(|source| PdfSheetError::Extraction {
                file: name.to_string(),
                source,
            })?;

        let (mut record, collisions) = self.flattener.flatten_with_collisions(&document);
        if !collisions.is_empty() {
            log::warn!("{}: colliding keys resolved: {}", name, collisions.join(", "));
        }
        record.set_source_file(name);
        Ok(record)
    }
}

/// Sequences stage, invoke and flatten over a batch of files and owns the
/// accumulated results.
///
/// ```text
/// Idle -> BatchSubmitted -> Processing -> AllComplete | PartiallyComplete
///   ^______________________ reset() _______________________|
/// ```
pub struct BatchOrchestrator<S, F> {
    pipeline: FilePipeline<S, F>,
    state: BatchState,
    jobs: usize,
    running: Option<Arc<AtomicBool>>,
}

impl<S: ObjectStore, F: ExtractionFunction> BatchOrchestrator<S, F> {
    pub fn new(store: S, function: F, function_name: &str, bucket: &str) -> Self {
        Self {
            pipeline: FilePipeline {
                uploader: StagingUploader::new(store),
                client: ExtractionClient::new(function, function_name),
                flattener: Flattener::default(),
                bucket: bucket.to_string(),
            },
            state: BatchState::default(),
            jobs: 1,
            running: None,
        }
    }

    /// Builds an orchestrator after validating the configuration.
    pub fn from_config(config: &Config, store: S, function: F) -> Result<Self> {
        config.validate()?;

        let orchestrator = Self {
            pipeline: FilePipeline {
                uploader: StagingUploader::new(store)
                    .with_content_type(config.storage.content_type.clone()),
                client: ExtractionClient::new(function, &config.function.name),
                flattener: Flattener::new(config.batch.separator),
                bucket: config.storage.bucket.clone(),
            },
            state: BatchState::default(),
            jobs: 1,
            running: None,
        }
        .with_jobs(config.batch.jobs);
        Ok(orchestrator)
    }

    /// Maximum number of files in flight in all-at-once mode.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// No new file is started once `running` turns false.
    pub fn with_cancellation(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn submit(&mut self, files: Vec<SubmittedFile>, mode: SequencingMode) -> Result<()> {
        if self.state.phase != BatchPhase::Idle {
            return Err(PdfSheetError::InvalidState {
                message: "a batch has already been submitted; reset it first".to_string(),
            });
        }

        log::info!("batch submitted: {} file(s), {}", files.len(), mode);
        self.state = BatchState::submitted(files, mode);
        Ok(())
    }

    /// Processes every submitted file, skipping over failures.
    ///
    /// Outcomes are accumulated in submission order even when several files
    /// are in flight. Files sharing a name share a bucket key, so they are
    /// never in flight together. `on_outcome` runs after every finished file.
    pub async fn run_all(
        &mut self,
        mut on_outcome: impl FnMut(&FileOutcome, &BatchProgress),
    ) -> Result<BatchReport> {
        self.expect_mode(SequencingMode::AllAtOnce)?;
        if self.state.phase != BatchPhase::BatchSubmitted {
            return Err(PdfSheetError::InvalidState {
                message: "the batch has already been run".to_string(),
            });
        }
        self.state.phase = BatchPhase::Processing;

        let jobs = self.jobs;
        let pipeline = &self.pipeline;
        let state = &mut self.state;
        let running = self.running.clone();
        let segments = distinct_name_segments(state.files.clone());

        let outcomes = stream::iter(segments).flat_map(move |segment| {
            let running = running.clone();
            stream::iter(segment)
                .take_while(move |_| {
                    future::ready(running.as_ref().map_or(true, |r| r.load(Ordering::SeqCst)))
                })
                .map(move |(index, file)| async move {
                    let result = pipeline.process(&file).await;
                    (index, file, result)
                })
                .buffered(jobs)
        });
        futures::pin_mut!(outcomes);

        while let Some((index, file, result)) = outcomes.next().await {
            let outcome = match result {
                Ok(record) => {
                    let fields = record.len();
                    log::info!("{}: extracted {} field(s)", file.name(), fields);
                    state.results.push(record);
                    state.progress.record_success(file.name());
                    FileOutcome::Succeeded {
                        index,
                        file_name: file.name().to_string(),
                        fields,
                    }
                }
                Err(error) => {
                    let failure = FileFailure::from_error(file.name(), &error);
                    log::info!("{}", failure);
                    state.progress.record_failure(&failure, true);
                    state.failures.push(failure.clone());
                    FileOutcome::Failed { index, failure }
                }
            };
            on_outcome(&outcome, &state.progress);
        }

        self.state.close();
        if !self.state.progress.is_finished() {
            return Err(PdfSheetError::Cancelled);
        }
        Ok(self.report())
    }

    /// Processes the file at the cursor.
    ///
    /// The cursor advances only on success, so a failed file can be
    /// attempted again with another call.
    pub async fn process_next(&mut self) -> Result<FileOutcome> {
        self.expect_mode(SequencingMode::OneAtATime)?;
        let cursor = match (self.state.phase, self.state.cursor) {
            (BatchPhase::BatchSubmitted | BatchPhase::Processing, Some(cursor))
                if cursor < self.state.files.len() =>
            {
                cursor
            }
            _ => {
                return Err(PdfSheetError::InvalidState {
                    message: "there is no file left to process".to_string(),
                })
            }
        };
        self.state.phase = BatchPhase::Processing;

        let file = self.state.files[cursor].clone();
        let outcome = match self.pipeline.process(&file).await {
            Ok(record) => {
                let fields = record.len();
                log::info!("{}: extracted {} field(s)", file.name(), fields);
                self.state.results.push(record);
                self.state.progress.record_success(file.name());
                self.state.cursor = Some(cursor + 1);
                FileOutcome::Succeeded {
                    index: cursor,
                    file_name: file.name().to_string(),
                    fields,
                }
            }
            Err(error) => {
                let failure = FileFailure::from_error(file.name(), &error);
                log::info!("{}", failure);
                self.state.progress.record_failure(&failure, false);
                self.state.failures.push(failure.clone());
                FileOutcome::Failed {
                    index: cursor,
                    failure,
                }
            }
        };

        if self.state.cursor == Some(self.state.files.len()) {
            self.state.close();
        }
        Ok(outcome)
    }

    /// Stops a one-at-a-time batch, leaving unprocessed files behind.
    pub fn finish(&mut self) -> BatchReport {
        if matches!(self.state.phase, BatchPhase::BatchSubmitted | BatchPhase::Processing) {
            self.state.close();
        }
        self.report()
    }

    /// Discards the files, cursor and results, returning to idle.
    pub fn reset(&mut self) {
        log::debug!("batch reset");
        self.state.results.clear();
        self.state = BatchState::default();
    }

    pub fn phase(&self) -> BatchPhase {
        self.state.phase
    }

    pub fn cursor(&self) -> Option<usize> {
        self.state.cursor
    }

    pub fn mode(&self) -> SequencingMode {
        self.state.mode
    }

    pub fn files(&self) -> &[SubmittedFile] {
        &self.state.files
    }

    /// The file a call to [`BatchOrchestrator::process_next`] would process.
    pub fn current_file(&self) -> Option<&SubmittedFile> {
        self.state.cursor.and_then(|cursor| self.state.files.get(cursor))
    }

    pub fn results(&self) -> &ResultSet {
        &self.state.results
    }

    pub fn progress(&self) -> &BatchProgress {
        &self.state.progress
    }

    pub fn failures(&self) -> &[FileFailure] {
        &self.state.failures
    }

    pub fn report(&self) -> BatchReport {
        let succeeded = self.state.results.len();
        BatchReport {
            mode: self.state.mode,
            phase: self.state.phase,
            total_files: self.state.files.len(),
            succeeded,
            failed: self.state.files.len() - succeeded,
            failures: self.state.failures.clone(),
            columns: self.state.results.columns(),
            started_at: self.state.started_at,
            duration: self.state.progress.elapsed(),
            artifact: None,
        }
    }

    fn expect_mode(&self, mode: SequencingMode) -> Result<()> {
        if self.state.phase == BatchPhase::Idle {
            return Err(PdfSheetError::InvalidState {
                message: "no batch has been submitted".to_string(),
            });
        }
        if self.state.mode != mode {
            return Err(PdfSheetError::InvalidState {
                message: format!("the batch was submitted in {} mode", self.state.mode),
            });
        }
        Ok(())
    }
}

/// Splits files, in order, into runs where every name occurs at most once.
fn distinct_name_segments(files: Vec<SubmittedFile>) -> Vec<Vec<(usize, SubmittedFile)>> {
    let mut segments: Vec<Vec<(usize, SubmittedFile)>> = Vec::new();
    let mut names = HashSet::new();

    for (index, file) in files.into_iter().enumerate() {
        if segments.is_empty() || names.contains(file.name()) {
            if !segments.is_empty() {
                log::debug!("{} is submitted again; waiting for the files in flight", file.name());
            }
            segments.push(Vec::new());
            names.clear();
        }
        names.insert(file.name().to_string());
        if let Some(segment) = segments.last_mut() {
            segment.push((index, file));
        }
    }

    segments
}

/// Runs a whole batch in all-at-once mode and returns its records.
pub async fn run<S, F>(
    store: S,
    function: F,
    function_name: &str,
    bucket: &str,
    files: Vec<SubmittedFile>,
) -> Result<ResultSet>
where
    S: ObjectStore,
    F: ExtractionFunction,
{
    let mut orchestrator = BatchOrchestrator::new(store, function, function_name, bucket);
    orchestrator.submit(files, SequencingMode::AllAtOnce)?;
    orchestrator.run_all(|_, _| {}).await?;
    Ok(std::mem::take(&mut orchestrator.state.results))
}
