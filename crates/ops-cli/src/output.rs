//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use ops_alerts::{AlertEvent, BatchOutcome, BatchReport, EventState, PageResult, StatusCounts};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for PageResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.items.is_empty() {
            writeln!(writer, "No alert events found")?;
            if self.total > 0 {
                writeln!(writer, "(page {} of {})", self.page, self.page_count())?;
            }
            return Ok(());
        }

        writeln!(
            writer,
            "{:<36}  {:<24}  {:<8}  {:<10}  {:<12}  {}",
            "ID", "ALERT", "SEVERITY", "STATUS", "OWNER", "LAST FIRED"
        )?;
        writeln!(writer, "{}", "─".repeat(112))?;

        for event in &self.items {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<8}  {:<10}  {:<12}  {}",
                event.id(),
                truncate(event.alertname().unwrap_or("-"), 24),
                event.severity(),
                event.status(),
                truncate(owner(event), 12),
                format_time(event.last_fired_at())
            )?;
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "Page {} of {} ({} event(s) total)",
            self.page,
            self.page_count(),
            self.total
        )?;
        Ok(())
    }
}

impl TableDisplay for AlertEvent {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Alert Event: {}", self.alertname().unwrap_or(self.id()))?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "ID:           {}", self.id())?;
        writeln!(writer, "Fingerprint:  {}", self.fingerprint())?;
        writeln!(writer, "Severity:     {}", self.severity())?;
        writeln!(writer, "Status:       {}", self.status())?;
        match self.state() {
            EventState::Firing => {}
            EventState::Claimed { claimed_by } => {
                writeln!(writer, "Claimed By:   {claimed_by}")?;
            }
            EventState::Silenced {
                silence_until,
                silenced_by,
            } => {
                writeln!(writer, "Silenced By:  {silenced_by}")?;
                writeln!(writer, "Until:        {}", format_time(*silence_until))?;
            }
            EventState::Resolved { resolved_at } => {
                writeln!(writer, "Resolved At:  {}", format_time(*resolved_at))?;
            }
        }
        writeln!(writer, "First Fired:  {}", format_time(self.first_fired_at()))?;
        writeln!(writer, "Last Fired:   {}", format_time(self.last_fired_at()))?;

        writeln!(writer)?;
        writeln!(writer, "Labels")?;
        for (key, value) in self.labels() {
            writeln!(writer, "  {key}={value}")?;
        }
        if !self.annotations().is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Annotations")?;
            for (key, value) in self.annotations() {
                writeln!(writer, "  {key}: {value}")?;
            }
        }
        Ok(())
    }
}

impl TableDisplay for StatusCounts {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Alert Events")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "  Firing:       {}", self.firing)?;
        writeln!(writer, "  Claimed:      {}", self.claimed)?;
        writeln!(writer, "  Silenced:     {}", self.silenced)?;
        writeln!(writer, "  Resolved:     {}", self.resolved)?;
        writeln!(writer, "  Total:        {}", self.total)?;
        Ok(())
    }
}

/// Result of a count query.
#[derive(Debug, Clone, Serialize)]
pub struct CountOutput {
    /// Matching events.
    pub count: usize,
}

impl TableDisplay for CountOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.count)?;
        Ok(())
    }
}

/// Result of a lifecycle change on one event.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutput {
    /// Operation performed.
    pub operation: String,
    /// The event after the change.
    pub event: AlertEvent,
}

impl TableDisplay for TransitionOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let event = &self.event;
        match event.state() {
            EventState::Silenced { silence_until, .. } => writeln!(
                writer,
                "✓ {} {}: silenced until {}",
                self.operation,
                event.id(),
                format_time(*silence_until)
            )?,
            _ => writeln!(
                writer,
                "✓ {} {}: now {}",
                self.operation,
                event.id(),
                event.status()
            )?,
        }
        Ok(())
    }
}

/// Outcome of one id in a batch silence.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemOutput {
    /// Event ID.
    pub id: String,
    /// `applied`, `failed`, or `skipped`.
    pub outcome: &'static str,
    /// Error kind, for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Error message, for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-id results of a batch silence.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSilenceOutput {
    /// Results in the order the ids were given.
    pub items: Vec<BatchItemOutput>,
    /// Whether the batch was interrupted.
    pub cancelled: bool,
}

impl From<&BatchReport> for BatchSilenceOutput {
    fn from(report: &BatchReport) -> Self {
        let items = report
            .items()
            .iter()
            .map(|item| {
                let (outcome, error_kind, error) = match &item.outcome {
                    BatchOutcome::Applied(_) => ("applied", None, None),
                    BatchOutcome::Failed(e) => ("failed", Some(e.kind()), Some(e.to_string())),
                    BatchOutcome::Skipped => ("skipped", None, None),
                };
                BatchItemOutput {
                    id: item.id.clone(),
                    outcome,
                    error_kind,
                    error,
                }
            })
            .collect();
        Self {
            items,
            cancelled: report.was_cancelled(),
        }
    }
}

impl BatchSilenceOutput {
    fn count(&self, outcome: &str) -> usize {
        self.items.iter().filter(|i| i.outcome == outcome).count()
    }
}

impl TableDisplay for BatchSilenceOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for item in &self.items {
            match (item.outcome, &item.error) {
                ("applied", _) => writeln!(writer, "✓ {}", item.id)?,
                ("failed", Some(error)) => writeln!(writer, "✗ {}: {error}", item.id)?,
                _ => writeln!(writer, "- {}: skipped", item.id)?,
            }
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "Silenced {} of {} event(s) ({} failed, {} skipped)",
            self.count("applied"),
            self.items.len(),
            self.count("failed"),
            self.count("skipped")
        )?;
        if self.cancelled {
            writeln!(writer, "Batch interrupted; events already silenced stay silenced")?;
        }
        Ok(())
    }
}

/// Result of a resolve report.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutput {
    /// Fingerprint that was reported clear.
    pub fingerprint: String,
    /// The resolved event, if an active one existed.
    pub event: Option<AlertEvent>,
}

impl TableDisplay for ResolveOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match &self.event {
            Some(event) => writeln!(writer, "✓ resolved {} ({})", event.id(), self.fingerprint)?,
            None => writeln!(writer, "No active event for fingerprint {}", self.fingerprint)?,
        }
        Ok(())
    }
}

fn owner(event: &AlertEvent) -> &str {
    match event.state() {
        EventState::Claimed { claimed_by } => claimed_by.as_str(),
        EventState::Silenced { silenced_by, .. } => silenced_by.as_str(),
        _ => "-",
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
