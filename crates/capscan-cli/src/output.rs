//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use capscan_domain::{ExtractionRun, RunStatus};
use capscan_extractor::{ExtractionResult, PersistOutcome};
use colored::*;
use serde_json::json;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format run history.
    pub fn format_runs(&self, runs: &[ExtractionRun]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(runs)?),
            OutputFormat::Table => Ok(self.format_runs_table(runs)),
        }
    }

    fn format_runs_table(&self, runs: &[ExtractionRun]) -> String {
        if runs.is_empty() {
            return self.colorize("No extraction runs found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Run", "File", "Kind", "App", "Status", "Chunks", "Extracted", "Error"]);

        for run in runs {
            let id = run.id.to_string();
            let summary = run.summary.unwrap_or_default();
            builder.push_record([
                id[..8.min(id.len())].to_string(),
                run.filename.clone(),
                run.file_kind.to_string(),
                run.application_id.map(|a| a.to_string()).unwrap_or_default(),
                self.status_label(run.status),
                summary.chunks.to_string(),
                summary.total_extracted.to_string(),
                run.error.clone().unwrap_or_default(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format the outcome of one extraction, with its persistence counts if any.
    pub fn format_extraction(
        &self,
        result: &ExtractionResult,
        outcome: Option<&PersistOutcome>,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = json!({
                    "run_id": result.run_id.to_string(),
                    "total_count": result.total_count,
                    "modules": result.modules,
                    "capabilities": result.capabilities,
                    "persisted": outcome.map(|o| json!({
                        "success_count": o.success_count,
                        "failed_count": o.failed_count,
                    })),
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Table => {
                let mut lines = vec![self.success(&format!(
                    "Run {} extracted {} capabilities",
                    result.run_id, result.total_count
                ))];

                if !result.modules.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["Area", "Capabilities"]);
                    for (area, count) in &result.modules {
                        builder.push_record([area.clone(), count.to_string()]);
                    }
                    let mut table = builder.build();
                    table.with(Style::rounded());
                    lines.push(table.to_string());
                }

                match outcome {
                    Some(o) if o.failed_count > 0 => lines.push(self.warning(&format!(
                        "Saved {} capabilities, {} failed",
                        o.success_count, o.failed_count
                    ))),
                    Some(o) => lines.push(self.success(&format!(
                        "Saved {} capabilities",
                        o.success_count
                    ))),
                    None => lines.push(self.info("No application given; nothing persisted")),
                }

                Ok(lines.join("\n"))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn status_label(&self, status: RunStatus) -> String {
        let color = match status {
            RunStatus::Processing => "cyan",
            RunStatus::Completed => "green",
            RunStatus::Failed => "red",
        };
        self.colorize(status.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capscan_domain::{FileKind, RawCapabilityRecord, RunSummary};
    use std::collections::BTreeMap;

    fn completed_run() -> ExtractionRun {
        let mut run = ExtractionRun::start("guide.pdf", FileKind::Pdf, Some(3), None, 100);
        let update = run
            .complete(
                RunSummary {
                    chunks: 2,
                    total_extracted: 14,
                },
                json!([]),
                160,
            )
            .unwrap();
        run.apply(&update);
        run
    }

    fn result() -> ExtractionResult {
        let mut modules = BTreeMap::new();
        modules.insert("Orders".to_string(), 1);
        ExtractionResult {
            run_id: completed_run().id,
            capabilities: vec![RawCapabilityRecord::new()
                .with("name", "createOrder")
                .with("area", "Orders")],
            total_count: 1,
            modules,
            raw_result: String::new(),
        }
    }

    #[test]
    fn test_runs_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_runs(&[completed_run()]).unwrap();
        assert!(output.contains("Status"));
        assert!(output.contains("guide.pdf"));
        assert!(output.contains("completed"));
        assert!(output.contains("14"));
    }

    #[test]
    fn test_runs_json() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_runs(&[completed_run()]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["filename"], "guide.pdf");
    }

    #[test]
    fn test_empty_runs() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_runs(&[]).unwrap();
        assert!(output.contains("No extraction runs found"));
    }

    #[test]
    fn test_extraction_summary() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let outcome = PersistOutcome {
            success_count: 1,
            ..PersistOutcome::default()
        };

        let output = formatter.format_extraction(&result(), Some(&outcome)).unwrap();
        assert!(output.contains("extracted 1 capabilities"));
        assert!(output.contains("Orders"));
        assert!(output.contains("Saved 1 capabilities"));

        let output = formatter.format_extraction(&result(), None).unwrap();
        assert!(output.contains("nothing persisted"));
    }

    #[test]
    fn test_extraction_json() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_extraction(&result(), None).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["capabilities"][0]["name"], "createOrder");
        assert!(parsed["persisted"].is_null());
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }

    #[test]
    fn test_error_message() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(
            formatter.error("Error: Configuration error: analysis.base_url must be set"),
            "✗ Error: Configuration error: analysis.base_url must be set"
        );
    }
}
