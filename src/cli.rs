use crate::batch::SequencingMode;
use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdfsheet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract structured data from PDFs into a spreadsheet")]
#[command(
    long_about = "pdfsheet uploads PDF files to an S3 bucket, invokes a Lambda extraction \
                  function for each of them, flattens the returned JSON into one row per \
                  file and exports the rows as an XLSX workbook."
)]
#[command(before_help = "📄 pdfsheet - PDF to spreadsheet extraction")]
#[command(after_help = "EXAMPLES:\n  \
    pdfsheet invoice.pdf\n  \
    pdfsheet ./scans --bucket my-pdf-bucket --jobs 4\n  \
    pdfsheet a.pdf b.pdf --mode one-at-a-time --show-table\n  \
    pdfsheet ./scans --output results/march.xlsx --force\n  \
    pdfsheet --generate-config > pdfsheet.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// PDF files, or directories containing PDF files
    #[arg(required_unless_present = "generate_config")]
    pub inputs: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Bucket the files are staged into
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Name or ARN of the extraction function
    #[arg(long)]
    pub function: Option<String>,

    /// AWS region of the bucket and the function
    #[arg(long)]
    pub region: Option<String>,

    /// How the batch is sequenced
    #[arg(short, long, value_enum)]
    pub mode: Option<SequencingMode>,

    /// Files processed concurrently in all-at-once mode (0 = one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Separator joining nested keys into column names
    #[arg(long)]
    pub separator: Option<char>,

    /// Spreadsheet file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the default spreadsheet name
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Overwrite an existing spreadsheet
    #[arg(long)]
    pub force: bool,

    /// Print the extracted table
    #[arg(long)]
    pub show_table: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "Validate the configuration and list the files without contacting AWS")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Print a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    /// File, then environment, then flags; the result is validated.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;
        config.apply_env();

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_bucket(self.bucket.clone())
            .with_function_name(self.function.clone())
            .with_region(self.region.clone())
            .with_mode(self.mode)
            .with_jobs(self.jobs)
            .with_separator(self.separator)
            .with_output_dir(self.output_dir.clone())
            .with_show_table(self.show_table)
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_format.into()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inputs_and_flags() {
        let cli = Cli::try_parse_from([
            "pdfsheet",
            "a.pdf",
            "scans",
            "--bucket",
            "my-pdf-bucket",
            "--mode",
            "one-at-a-time",
            "--jobs",
            "4",
            "--separator",
            ".",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.inputs, vec![PathBuf::from("a.pdf"), PathBuf::from("scans")]);
        assert_eq!(cli.bucket.as_deref(), Some("my-pdf-bucket"));
        assert_eq!(cli.mode, Some(SequencingMode::OneAtATime));
        assert_eq!(cli.jobs, Some(4));
        assert_eq!(cli.separator, Some('.'));
        assert_eq!(cli.verbosity_level(), 2);
        assert_eq!(cli.output_mode(), OutputMode::Human);
    }

    #[test]
    fn test_inputs_required_unless_generating_config() {
        assert!(Cli::try_parse_from(["pdfsheet", "--show-table"]).is_err());

        let cli = Cli::try_parse_from(["pdfsheet", "--generate-config"]).unwrap();
        assert!(cli.generate_config);
        assert!(cli.inputs.is_empty());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["pdfsheet", "a.pdf", "-q", "-v"]).is_err());

        let cli = Cli::try_parse_from(["pdfsheet", "a.pdf", "-q"]).unwrap();
        assert_eq!(cli.verbosity_level(), 0);
        assert!(!cli.is_verbose());
    }

    #[test]
    fn test_overrides_reach_config() {
        let cli = Cli::try_parse_from([
            "pdfsheet",
            "a.pdf",
            "--function",
            "extract-fields",
            "--region",
            "eu-west-1",
            "--output-dir",
            "out",
            "--show-table",
            "--jobs",
            "0",
        ])
        .unwrap();

        let mut config = Config::default();
        config.merge_with_cli_args(&cli.create_cli_overrides());
        assert_eq!(config.function.name, "extract-fields");
        assert_eq!(config.aws_credentials.region, "eu-west-1");
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert!(config.output.show_table);
        assert!(config.batch.jobs >= 1);
    }

    #[test]
    fn test_output_format_parsing() {
        let cli = Cli::try_parse_from(["pdfsheet", "a.pdf", "--output-format", "json"]).unwrap();
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }
}
