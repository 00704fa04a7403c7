use thiserror::Error;

/// Failure reported by the object store while staging a file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct StageError {
    pub code: String,
    pub message: String,
}

impl StageError {
    pub fn new<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Failure reported while invoking the remote extraction function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The call could not be completed, or the credentials were rejected.
    #[error("{code}: {message}")]
    ClientError { code: String, message: String },

    /// The function ran but reported a failure.
    #[error("{message}")]
    RemoteFailure { message: String },

    /// The response did not have the expected nested JSON shape.
    #[error("{message}")]
    Decode { message: String },
}

#[derive(Error, Debug)]
pub enum PdfSheetError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Staging {file} failed: {source}")]
    Stage {
        file: String,
        #[source]
        source: StageError,
    },

    #[error("Extracting {file} failed: {source}")]
    Extraction {
        file: String,
        #[source]
        source: ExtractionError,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input {path}: {reason}")]
    InvalidInput { path: String, reason: String },

    #[error("No PDF files found in the given inputs")]
    NoInputFiles { inputs: Vec<String> },

    #[error("Invalid batch state: {message}")]
    InvalidState { message: String },

    #[error("Export failed: {message}")]
    Export { message: String },

    #[error("Output file already exists: {path}")]
    OutputExists { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    /// Short label naming the kind of failure.
    fn category(&self) -> &'static str;
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for PdfSheetError {
    fn category(&self) -> &'static str {
        match self {
            PdfSheetError::Config { .. } => "Configuration error",
            PdfSheetError::Stage { .. } => "Upload failed",
            PdfSheetError::Extraction { source, .. } => match source {
                ExtractionError::ClientError { .. } => "Transport error",
                ExtractionError::RemoteFailure { .. } => "Remote failure",
                ExtractionError::Decode { .. } => "Decode error",
            },
            PdfSheetError::Io(_) => "IO error",
            PdfSheetError::InvalidInput { .. } | PdfSheetError::NoInputFiles { .. } => {
                "Invalid input"
            }
            PdfSheetError::InvalidState { .. } => "Batch error",
            PdfSheetError::Export { .. } | PdfSheetError::OutputExists { .. } => "Export failed",
            PdfSheetError::Cancelled => "Cancelled",
        }
    }

    fn user_message(&self) -> String {
        match self {
            PdfSheetError::Config { message } => message.clone(),
            PdfSheetError::Stage { file, source } => {
                format!("could not upload {} ({})", file, source)
            }
            PdfSheetError::Extraction { file, source } => match source {
                ExtractionError::ClientError { code, message } => {
                    format!("could not invoke the extraction function for {} ({}: {})", file, code, message)
                }
                ExtractionError::RemoteFailure { message } => {
                    format!("extraction function failed for {}: {}", file, message)
                }
                ExtractionError::Decode { message } => {
                    format!("unreadable extraction result for {}: {}", file, message)
                }
            },
            PdfSheetError::InvalidInput { path, reason } => format!("{}: {}", path, reason),
            PdfSheetError::NoInputFiles { inputs } => {
                format!("No PDF files found in: {}", inputs.join(", "))
            }
            PdfSheetError::OutputExists { path } => format!("{} already exists", path),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            PdfSheetError::Config { .. } => Some(
                "Check the [aws_credentials] table of your configuration file (or the AWS_* environment variables), \
                 and the bucket and function names. Run with --generate-config for a template.".to_string()
            ),
            PdfSheetError::Stage { .. } => Some(
                "Verify the bucket exists, the region is correct and the credentials allow s3:PutObject.".to_string()
            ),
            PdfSheetError::Extraction { source: ExtractionError::ClientError { .. }, .. } => Some(
                "Check your network connection and that the credentials allow lambda:InvokeFunction.".to_string()
            ),
            PdfSheetError::Extraction { .. } => Some(
                "Inspect the extraction function's logs; the file can be re-submitted once the problem is fixed.".to_string()
            ),
            PdfSheetError::NoInputFiles { .. } => Some(
                "Pass PDF files directly, or directories that contain *.pdf files.".to_string()
            ),
            PdfSheetError::OutputExists { .. } => Some(
                "Remove the existing file, choose another name with --output, or use --force to overwrite.".to_string()
            ),
            PdfSheetError::InvalidState { .. } => Some(
                "Reset the batch before submitting new files.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for PdfSheetError {
    fn from(error: toml::de::Error) -> Self {
        PdfSheetError::Config {
            message: error.to_string(),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for PdfSheetError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        PdfSheetError::Export {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfSheetError>;
