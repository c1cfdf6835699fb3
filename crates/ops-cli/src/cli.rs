//! Command-line argument parsing with clap.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ops_alerts::{AlertSeverity, EventStatus};

/// opsctl - triage fired alert events.
#[derive(Parser, Debug, Clone)]
#[command(name = "opsctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the alert event snapshot.
    #[arg(long, env = "OPSCTL_STATE_DIR", default_value = ".opsctl")]
    pub state_dir: PathBuf,

    /// JSON file with lifecycle settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Operator performing lifecycle changes.
    #[arg(short, long, env = "OPSCTL_OPERATOR")]
    pub operator: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List alert events.
    List(ListArgs),

    /// Count alert events matching a filter.
    Count(FilterArgs),

    /// Show how many events are in each status.
    Summary,

    /// Show one alert event.
    Get {
        /// Event ID.
        id: String,
    },

    /// Take ownership of a firing event.
    Claim {
        /// Event ID.
        id: String,
    },

    /// Give up a claim, returning the event to firing.
    Release {
        /// Event ID.
        id: String,
    },

    /// Suppress an event for a while.
    Silence {
        /// Event ID.
        id: String,

        /// How long to silence for (e.g. 30m, 2h, 1d).
        #[arg(long = "for", value_name = "DURATION", value_parser = parse_duration_arg)]
        duration: Duration,
    },

    /// Lift a silence early.
    Unsilence {
        /// Event ID.
        id: String,
    },

    /// Silence many events at once.
    ///
    /// Each id succeeds or fails on its own. Ctrl-C stops the batch between
    /// chunks; ids already silenced stay silenced.
    BatchSilence {
        /// Event IDs.
        #[arg(required = true)]
        ids: Vec<String>,

        /// How long to silence for (e.g. 30m, 2h, 1d).
        #[arg(long = "for", value_name = "DURATION", value_parser = parse_duration_arg)]
        duration: Duration,
    },

    /// Report a firing condition, as the ingestion pipeline would.
    Report(ReportArgs),

    /// Report that the condition with a fingerprint cleared.
    Resolve {
        /// Fingerprint of the condition.
        fingerprint: String,
    },
}

/// Filter flags shared by `list` and `count`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only events in this status.
    #[arg(short, long)]
    pub status: Option<EventStatus>,

    /// Only events carrying this label (repeatable).
    #[arg(short, long, value_name = "KEY=VALUE", value_parser = parse_label)]
    pub label: Vec<(String, String)>,

    /// Only events with this fingerprint.
    #[arg(long)]
    pub fingerprint: Option<String>,

    /// Case-insensitive match on label values.
    #[arg(long)]
    pub search: Option<String>,

    /// Only events still firing at or after this time (RFC 3339).
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Only events that started firing before this time (RFC 3339).
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Filters.
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Page number, starting at 1.
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Events per page; defaults to the configured page size.
    #[arg(long)]
    pub page_size: Option<usize>,
}

/// Arguments for the report command.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Source label (repeatable).
    #[arg(short, long, required = true, value_name = "KEY=VALUE", value_parser = parse_label)]
    pub label: Vec<(String, String)>,

    /// Annotation (repeatable).
    #[arg(short, long, value_name = "KEY=VALUE", value_parser = parse_label)]
    pub annotation: Vec<(String, String)>,

    /// Severity of the condition.
    #[arg(long, default_value_t = AlertSeverity::Warning)]
    pub severity: AlertSeverity,
}

fn parse_label(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn parse_duration_arg(raw: &str) -> Result<Duration, String> {
    ops_alerts::parse_duration(raw).map_err(|e| e.to_string())
}
