use clap::Parser;
use pdfsheet::config::mask;
use pdfsheet::{
    collect_inputs, Cli, Config, OutputFormatter, PdfSheet, PdfSheetError, UserFriendlyError,
};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(&cli);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let pdfsheet = match PdfSheet::from_cli(&cli) {
        Ok(pdfsheet) => pdfsheet,
        Err(e) => {
            print_startup_error(&cli, &e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&cli, &pdfsheet);
    }

    match pdfsheet.process(&cli.inputs).await {
        Ok(report) => {
            if report.is_complete_success() {
                0
            } else {
                2 // Some files produced no record
            }
        }
        Err(e) => {
            pdfsheet.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &PdfSheetError) -> i32 {
    match error {
        PdfSheetError::Cancelled => 130, // Interrupted (SIGINT)
        PdfSheetError::Config { .. } => 3,
        PdfSheetError::Export { .. } | PdfSheetError::OutputExists { .. } => 4,
        PdfSheetError::InvalidInput { .. }
        | PdfSheetError::NoInputFiles { .. }
        | PdfSheetError::Stage { .. }
        | PdfSheetError::Extraction { .. } => 2,
        _ => 1,
    }
}

/// Without `--config` the sample is printed to stdout.
fn handle_generate_config(cli: &Cli) -> i32 {
    let Some(ref config_path) = cli.config else {
        print!("{}", Config::create_sample_config());
        return 0;
    };

    if config_path.exists() && !cli.force {
        eprintln!(
            "{} already exists; use --force to overwrite it",
            config_path.display()
        );
        return 4;
    }

    match PdfSheet::generate_sample_config(config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path.display());
            println!("\nTo use this configuration:");
            println!("  pdfsheet <PDF>... --config {}", config_path.display());
            println!("\nEdit the file to fill in your credentials and bucket.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(cli: &Cli, pdfsheet: &PdfSheet) -> i32 {
    let formatter = pdfsheet.output_formatter();

    formatter.print_header("DRY RUN - nothing will be uploaded");

    let files = match collect_inputs(&cli.inputs) {
        Ok(files) => files,
        Err(e) => {
            pdfsheet.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    let config = pdfsheet.config();
    formatter.info("Configuration that would be used:");
    formatter.print_field("Access key", &mask(&config.aws_credentials.access_key_id));
    formatter.print_field("Secret key", &mask(&config.aws_credentials.secret_access_key));
    formatter.print_field("Region", &config.aws_credentials.region);
    formatter.print_field("Bucket", &config.storage.bucket);
    formatter.print_field("Function", &config.function.name);
    formatter.print_field("Mode", &config.batch.mode.to_string());
    formatter.print_field("Jobs", &config.batch.jobs.to_string());
    formatter.print_separator();

    formatter.info(&format!("{} file(s) would be processed:", files.len()));
    for file in &files {
        formatter.print_field("File", file.name());
    }

    let writer = pdfsheet.artifact_writer(files.len());
    formatter.print_field("Spreadsheet", &writer.path().display().to_string());
    if let Err(e) = writer.check() {
        pdfsheet.handle_error(&e);
        return exit_code_for(&e);
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    0
}

fn print_startup_error(cli: &Cli, error: &PdfSheetError) {
    let formatter = OutputFormatter::new(cli.output_mode(), 0, false);
    formatter.print_user_friendly_error(error);
}

/// `RUST_LOG` takes precedence over the verbosity flags.
fn setup_logging(cli: &Cli) {
    let filter = log_filter(cli.quiet, cli.verbose);
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .target(env_logger::Target::Stderr)
        .try_init();
}

fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        let path_arg = config_path.display().to_string();

        let cli = Cli::try_parse_from(["pdfsheet", "--generate-config", "--config", &path_arg]).unwrap();
        assert_eq!(handle_generate_config(&cli), 0);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[aws_credentials]"));

        // Refuses to replace it without --force
        assert_eq!(handle_generate_config(&cli), 4);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&PdfSheetError::Cancelled), 130);
        assert_eq!(
            exit_code_for(&PdfSheetError::Config { message: "x".to_string() }),
            3
        );
        assert_eq!(
            exit_code_for(&PdfSheetError::OutputExists { path: "x".to_string() }),
            4
        );
        assert_eq!(
            exit_code_for(&PdfSheetError::NoInputFiles { inputs: Vec::new() }),
            2
        );
        assert_eq!(
            exit_code_for(&PdfSheetError::InvalidState { message: "x".to_string() }),
            1
        );
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(true, 0), "error");
        assert_eq!(log_filter(false, 0), "warn");
        assert_eq!(log_filter(false, 1), "info");
        assert_eq!(log_filter(false, 2), "debug");
        assert_eq!(log_filter(false, 5), "trace");
    }
}
