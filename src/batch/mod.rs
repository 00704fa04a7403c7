pub mod input;
pub mod orchestrator;
pub mod progress;

pub use input::{collect_inputs, FileOrigin, SubmittedFile};
pub use orchestrator::{BatchOrchestrator, BatchPhase, BatchState};
pub use progress::{BatchProgress, BatchReport, FileFailure, FileOutcome};

use serde::{Deserialize, Serialize};

/// How the files of a batch are sequenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SequencingMode {
    /// Process every file in one run, skipping over failures.
    AllAtOnce,
    /// Process the file at the cursor; a failure leaves the cursor in place.
    OneAtATime,
}

impl Default for SequencingMode {
    fn default() -> Self {
        SequencingMode::AllAtOnce
    }
}

impl std::fmt::Display for SequencingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequencingMode::AllAtOnce => write!(f, "all-at-once"),
            SequencingMode::OneAtATime => write!(f, "one-at-a-time"),
        }
    }
}
