//! Ingestion commands: report a firing condition, report it cleared.

use std::io::Write;

use ops_alerts::{FiringReport, ReportEvent};

use crate::cli::ReportArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::{OutputFormat, ResolveOutput, TransitionOutput};

/// Handler for ingestion commands.
pub struct IngestCommand<'a> {
    ctx: &'a AppContext,
}

impl<'a> IngestCommand<'a> {
    /// Creates a new handler.
    #[must_use]
    pub const fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Reports a firing condition.
    ///
    /// # Errors
    ///
    /// Returns error if the report is rejected.
    pub async fn report<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ReportArgs,
    ) -> Result<(), CliError> {
        let mut report = FiringReport::new(args.label.iter().cloned().collect()).severity(args.severity);
        for (key, value) in &args.annotation {
            report = report.annotation(key, value);
        }

        let event = self.ctx.engine().report_firing(report)?;
        format.write(
            out,
            &TransitionOutput {
                operation: "report".to_string(),
                event,
            },
        )
    }

    /// Reports that a condition cleared.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn resolve<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        fingerprint: &str,
    ) -> Result<(), CliError> {
        let event = self.ctx.engine().report_resolved(fingerprint)?;
        format.write(
            out,
            &ResolveOutput {
                fingerprint: fingerprint.to_string(),
                event,
            },
        )
    }
}
