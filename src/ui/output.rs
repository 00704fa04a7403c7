use crate::batch::{BatchReport, FileOutcome};
use crate::error::{PdfSheetError, UserFriendlyError};
use crate::export::table::{cell_text, Table};
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    term: Term,
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            term,
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &PdfSheetError) {
        self.error(&format!("{}: {}", error.category(), error.user_message()));

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// One line per finished file.
    pub fn print_file_outcome(&self, outcome: &FileOutcome, total_files: usize) {
        let position = format!("[{}/{}]", outcome.index() + 1, total_files);
        match (self.mode, outcome) {
            (OutputMode::Json, FileOutcome::Succeeded { file_name, fields, .. }) => {
                self.print_json_object(&json!({
                    "type": "file",
                    "status": "succeeded",
                    "file": file_name,
                    "fields": fields,
                }));
            }
            (OutputMode::Json, FileOutcome::Failed { failure, .. }) => {
                self.print_json_object(&json!({
                    "type": "file",
                    "status": "failed",
                    "file": failure.file_name,
                    "category": failure.category,
                    "message": failure.message,
                }));
            }
            (_, FileOutcome::Succeeded { file_name, fields, .. }) => {
                self.success(&format!("{} {}: {} field(s) extracted", position, file_name, fields));
            }
            (_, FileOutcome::Failed { failure, .. }) => {
                self.error(&format!("{} {}", position, failure));
            }
        }
    }

    pub fn print_batch_summary(&self, report: &BatchReport) {
        match self.mode {
            OutputMode::Human => {
                if !self.quiet {
                    self.print_human_summary(report);
                }
            }
            OutputMode::Json => {
                let mut summary = serde_json::to_value(report).unwrap_or_else(|_| json!({}));
                if let Value::Object(ref mut map) = summary {
                    map.insert("type".to_string(), json!("summary"));
                    map.insert("duration_ms".to_string(), json!(report.duration.as_millis() as u64));
                    map.insert("timestamp".to_string(), json!(chrono::Utc::now().to_rfc3339()));
                }
                self.print_json_object(&summary);
            }
            OutputMode::Plain => {
                if !self.quiet {
                    self.print_plain_summary(report);
                }
            }
        }
    }

    /// Prints the accumulated table.
    pub fn print_table(&self, table: &Table) {
        match self.mode {
            OutputMode::Human => self.print_human_table(table),
            OutputMode::Json => {
                let rows: Vec<Value> = table
                    .rows
                    .iter()
                    .map(|row| {
                        let object: Map<String, Value> = table
                            .columns
                            .iter()
                            .zip(row)
                            .map(|(column, cell)| (column.clone(), cell.clone().unwrap_or(Value::Null)))
                            .collect();
                        Value::Object(object)
                    })
                    .collect();
                self.print_json_object(&json!({ "type": "table", "rows": rows }));
            }
            OutputMode::Plain => {
                println!("{}", table.columns.join("\t"));
                for row in &table.rows {
                    let cells: Vec<String> = row.iter().map(|cell| cell_text(cell.as_ref())).collect();
                    println!("{}", cells.join("\t"));
                }
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    /// A `key: value` line, or a JSON object field in JSON mode.
    pub fn print_field(&self, key: &str, value: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Json => self.print_json_object(&json!({ "type": "field", "key": key, "value": value })),
            _ => println!("  {:<16} {}", format!("{}:", key), value),
        }
    }

    /// Asks a yes/no question; false unless stdout is an interactive terminal.
    pub fn confirm(&self, question: &str) -> bool {
        if self.quiet || self.mode == OutputMode::Json || !self.term.is_term() {
            return false;
        }

        if self.term.write_str(&format!("{} [y/N] ", question)).is_err() {
            return false;
        }
        match self.term.read_line() {
            Ok(answer) => is_yes(&answer),
            Err(_) => false,
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, text: String) -> String {
        if self.use_colors {
            style(text).cyan().bold().to_string()
        } else {
            text
        }
    }

    fn print_human_summary(&self, report: &BatchReport) {
        println!();
        self.print_separator();

        let headline = if report.is_complete_success() {
            "Batch completed!"
        } else {
            "Batch finished with failures"
        };
        if self.use_colors {
            let styled = if report.is_complete_success() {
                style(headline).green().bold()
            } else {
                style(headline).yellow().bold()
            };
            println!("{} {}", styled, if report.is_complete_success() { CHECKMARK } else { WARNING });
        } else {
            println!("{}", headline);
        }

        println!();
        println!("  Files submitted: {}", self.highlight(report.total_files.to_string()));
        println!("  Succeeded:       {}", self.highlight(report.succeeded.to_string()));
        if report.failed > 0 {
            println!("  Failed:          {}", self.highlight(report.failed.to_string()));
        }
        println!("  Columns:         {}", self.highlight(report.columns.len().to_string()));
        println!("  Time taken:      {}", self.highlight(format_duration(report.duration)));
        if let Some(ref artifact) = report.artifact {
            println!("  Spreadsheet:     {}", self.highlight(artifact.display().to_string()));
        }

        if !report.failures.is_empty() {
            println!();
            println!("Issues encountered:");
            for failure in &report.failures {
                println!("  - {}", failure);
            }
        }

        self.print_separator();
    }

    fn print_plain_summary(&self, report: &BatchReport) {
        println!("COMPLETED: {} batch", report.mode);
        println!("Files: {}", report.total_files);
        println!("Succeeded: {}", report.succeeded);
        println!("Failed: {}", report.failed);
        println!("Duration: {:?}", report.duration);
        if let Some(ref artifact) = report.artifact {
            println!("Spreadsheet: {}", artifact.display());
        }
        for failure in &report.failures {
            println!("FAILURE: {}", failure);
        }
    }

    fn print_human_table(&self, table: &Table) {
        if table.columns.is_empty() {
            println!("(no records)");
            return;
        }

        let widths = table.column_widths();
        let line = |cells: Vec<String>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join(" | ")
        };

        let header = line(table.columns.clone());
        if self.use_colors {
            println!("{}", style(header).bold());
        } else {
            println!("{}", header);
        }
        println!(
            "{}",
            widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
        );
        for row in &table.rows {
            println!("{}", line(row.iter().map(|cell| cell_text(cell.as_ref())).collect()));
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

// Progress-aware output wrapper
pub struct ProgressAwareOutput<'a> {
    formatter: &'a OutputFormatter,
    progress_manager: Option<&'a crate::ui::ProgressManager>,
}

impl<'a> ProgressAwareOutput<'a> {
    pub fn new(
        formatter: &'a OutputFormatter,
        progress_manager: Option<&'a crate::ui::ProgressManager>,
    ) -> Self {
        Self {
            formatter,
            progress_manager,
        }
    }

    pub fn suspend_and_print<F>(&self, f: F)
    where
        F: FnOnce(&OutputFormatter),
    {
        if let Some(pm) = self.progress_manager {
            pm.suspend(|| f(self.formatter));
        } else {
            f(self.formatter);
        }
    }

    pub fn file_outcome(&self, outcome: &FileOutcome, total_files: usize) {
        self.suspend_and_print(|f| f.print_file_outcome(outcome, total_files));
    }

    pub fn warning(&self, message: &str) {
        self.suspend_and_print(|f| f.warning(message));
    }
}
