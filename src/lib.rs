pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod record;
pub mod remote;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, OutputConfig};
pub use error::{ExtractionError, PdfSheetError, Result, StageError, UserFriendlyError};

// Core functionality re-exports
pub use batch::{
    collect_inputs, BatchOrchestrator, BatchPhase, BatchProgress, BatchReport, FileFailure,
    FileOutcome, SequencingMode, SubmittedFile,
};
pub use export::{export, ArtifactWriter, Table};
pub use record::{flatten, Document, FlatRecord, Flattener, ResultSet};
pub use remote::{ExtractionClient, ExtractionFunction, ObjectStore, StagingUploader};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressAwareOutput, ProgressManager};

use std::path::{Path, PathBuf};

/// Main library interface for pdfsheet functionality
pub struct PdfSheet {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
    output_path: Option<PathBuf>,
    force: bool,
}

impl PdfSheet {
    /// Create a new PdfSheet instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            output_path: None,
            force: false,
        })
    }

    /// Create a new PdfSheet instance for testing (no signal handler conflicts)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
            output_path: None,
            force: false,
        }
    }

    /// Create PdfSheet instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let pdfsheet = Self::new(config, cli_args.output_mode(), cli_args.verbose, cli_args.quiet)?;
        Ok(pdfsheet.with_output(cli_args.output.clone(), cli_args.force))
    }

    /// Explicit spreadsheet path, and whether it may replace an existing file.
    pub fn with_output(mut self, output_path: Option<PathBuf>, force: bool) -> Self {
        self.output_path = output_path;
        self.force = force;
        self
    }

    /// Writer for a batch of `file_count` files.
    pub fn artifact_writer(&self, file_count: usize) -> ArtifactWriter {
        ArtifactWriter::from_config(&self.config.output, self.output_path.as_deref(), file_count)
            .with_force_overwrite(self.force)
    }

    /// Processes the PDFs found in `inputs` against AWS and writes the spreadsheet.
    pub async fn process(&self, inputs: &[PathBuf]) -> Result<BatchReport> {
        let files = collect_inputs(inputs)?;
        self.config.validate()?;
        self.artifact_writer(files.len()).check()?;

        let spinner = self.progress_manager.create_spinner("Connecting to AWS");
        let connected = remote::connect(&self.config).await;
        spinner.finish_and_clear();
        let (store, function) = connected?;

        self.process_with(store, function, files).await
    }

    /// Runs a batch against the given collaborators.
    pub async fn process_with<S, F>(
        &self,
        store: S,
        function: F,
        files: Vec<SubmittedFile>,
    ) -> Result<BatchReport>
    where
        S: ObjectStore,
        F: ExtractionFunction,
    {
        let writer = self.artifact_writer(files.len());
        writer.check()?;

        let mut orchestrator = BatchOrchestrator::from_config(&self.config, store, function)?
            .with_cancellation(self.shutdown.flag());
        let mode = self.config.batch.mode;

        self.output_formatter.start_operation(&format!(
            "Processing {} file(s) with {} ({})",
            files.len(),
            self.config.function.name,
            mode
        ));
        orchestrator.submit(files, mode)?;

        let mut report = match mode {
            SequencingMode::AllAtOnce => self.run_all_at_once(&mut orchestrator).await?,
            SequencingMode::OneAtATime => self.run_one_at_a_time(&mut orchestrator).await?,
        };

        if self.config.output.show_table || self.output_formatter.mode() == OutputMode::Json {
            self.output_formatter
                .print_table(&Table::from_result_set(orchestrator.results()));
        }

        let artifact = writer.write(orchestrator.results(), &report)?;
        report.artifact = Some(artifact);
        self.output_formatter.print_batch_summary(&report);

        Ok(report)
    }

    async fn run_all_at_once<S, F>(&self, orchestrator: &mut BatchOrchestrator<S, F>) -> Result<BatchReport>
    where
        S: ObjectStore,
        F: ExtractionFunction,
    {
        let total = orchestrator.files().len();
        let pb = self.progress_manager.create_batch_progress(total as u64);
        let output = ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager));

        let result = orchestrator
            .run_all(|outcome, progress| {
                ui::progress::update_batch_progress(&pb, progress);
                output.file_outcome(outcome, total);
            })
            .await;

        match result {
            Ok(report) => {
                ui::progress::finish_progress_with_summary(
                    &pb,
                    &format!("{}/{} file(s) extracted", report.succeeded, report.total_files),
                    report.duration,
                );
                Ok(report)
            }
            Err(e) => {
                pb.abandon_with_message("stopped");
                Err(e)
            }
        }
    }

    /// Works through the files at the cursor, offering a re-attempt after
    /// each failure.
    async fn run_one_at_a_time<S, F>(&self, orchestrator: &mut BatchOrchestrator<S, F>) -> Result<BatchReport>
    where
        S: ObjectStore,
        F: ExtractionFunction,
    {
        let total = orchestrator.files().len();
        let pb = self.progress_manager.create_batch_progress(total as u64);
        let output = ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager));

        while let Some(file) = orchestrator.current_file() {
            let file_name = file.name().to_string();
            if !self.shutdown.is_running() {
                pb.abandon_with_message("stopped");
                orchestrator.finish();
                return Err(PdfSheetError::Cancelled);
            }

            let outcome = orchestrator.process_next().await?;
            ui::progress::update_batch_progress(&pb, orchestrator.progress());
            output.file_outcome(&outcome, total);

            if !outcome.is_success() {
                let retry = self.progress_manager.suspend(|| {
                    self.output_formatter
                        .confirm(&format!("Re-attempt {}?", file_name))
                });
                if !retry {
                    output.warning(&format!(
                        "Stopping at {}; {} file(s) left unprocessed",
                        file_name,
                        total - orchestrator.results().len()
                    ));
                    break;
                }
            }
        }

        let report = orchestrator.finish();
        ui::progress::finish_progress_with_summary(
            &pb,
            &format!("{}/{} file(s) extracted", report.succeeded, report.total_files),
            report.duration,
        );
        Ok(report)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &PdfSheetError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
