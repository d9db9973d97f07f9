//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use flowcheck_core::{EvaluationResult, Mode};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Log lines only
    #[default]
    Plain,
    /// Summary table followed by failures
    Table,
    /// JSON document on stdout
    Json,
}

/// Print the run summary in `format`
pub fn print_result(result: &EvaluationResult, format: OutputFormat) {
    match format {
        OutputFormat::Plain => {}
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
        }
        OutputFormat::Table => print_table(result),
    }
}

fn print_table(result: &EvaluationResult) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mode = match result.mode {
        Mode::Contract => "contract",
        Mode::Runtime => "runtime",
    };
    table.set_header(vec!["Mode", "Version", "Flows", "Steps", "Failed", "Error rate", "Verdict"]);
    table.add_row(vec![
        mode.to_string(),
        result.version.clone(),
        result.flow_files.to_string(),
        result.total_steps.to_string(),
        result.failed_steps.to_string(),
        format!("{:.2}%", result.error_rate_pct()),
        if result.passed() { "PASS" } else { "FAIL" }.to_string(),
    ]);
    println!("{table}");

    if let Some(ms) = result.startup_ms {
        println!("Startup: {:.1} ms", ms);
    }

    if result.passed() {
        println!("{} all flows passed", "✅".green());
        return;
    }

    let mut failures = Table::new();
    failures
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    failures.set_header(vec!["#", "Failure"]);
    for (i, e) in result.errors.iter().enumerate() {
        failures.add_row(vec![(i + 1).to_string(), e.clone()]);
    }
    println!("{failures}");
    println!("{} {} failure(s)", "❌".red(), result.errors.len());
}
