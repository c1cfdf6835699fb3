//! Lifecycle commands: claim, release, silence, unsilence, batch-silence.

use std::io::Write;
use std::time::Duration;

use ops_alerts::{AlertEvent, CancelFlag};
use tracing::warn;

use crate::context::AppContext;
use crate::error::CliError;
use crate::output::{BatchSilenceOutput, OutputFormat, TransitionOutput};

/// Handler for lifecycle commands.
pub struct LifecycleCommand<'a> {
    ctx: &'a AppContext,
}

impl<'a> LifecycleCommand<'a> {
    /// Creates a new handler.
    #[must_use]
    pub const fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Claims an event for the operator.
    ///
    /// # Errors
    ///
    /// Returns error if no operator is set or the claim is rejected.
    pub async fn claim<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        id: &str,
    ) -> Result<(), CliError> {
        let event = self.ctx.engine().claim(id, self.ctx.operator()?)?;
        write_transition(out, format, "claim", event)
    }

    /// Releases the operator's claim.
    ///
    /// # Errors
    ///
    /// Returns error if no operator is set or the release is rejected.
    pub async fn release<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        id: &str,
    ) -> Result<(), CliError> {
        let event = self.ctx.engine().release(id, self.ctx.operator()?)?;
        write_transition(out, format, "release", event)
    }

    /// Silences an event.
    ///
    /// # Errors
    ///
    /// Returns error if no operator is set or the silence is rejected.
    pub async fn silence<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        id: &str,
        duration: Duration,
    ) -> Result<(), CliError> {
        let event = self
            .ctx
            .engine()
            .silence(id, duration, self.ctx.operator()?)?;
        write_transition(out, format, "silence", event)
    }

    /// Lifts a silence.
    ///
    /// # Errors
    ///
    /// Returns error if no operator is set or the event is not silenced.
    pub async fn unsilence<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        id: &str,
    ) -> Result<(), CliError> {
        let event = self.ctx.engine().unsilence(id, self.ctx.operator()?)?;
        write_transition(out, format, "unsilence", event)
    }

    /// Silences many events, stopping between chunks on Ctrl-C.
    ///
    /// Per-id failures are reported, not returned as an error.
    ///
    /// # Errors
    ///
    /// Returns error if no operator is set or the batch is rejected as a whole.
    pub async fn batch_silence<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        ids: &[String],
        duration: Duration,
    ) -> Result<(), CliError> {
        let operator = self.ctx.operator()?.to_string();
        let engine = self.ctx.engine().clone();
        let ids = ids.to_vec();
        let cancel = CancelFlag::new();

        let worker_cancel = cancel.clone();
        let mut batch = tokio::task::spawn_blocking(move || {
            engine.batch_silence(&ids, duration, &operator, &worker_cancel)
        });

        let joined = tokio::select! {
            joined = &mut batch => joined,
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupt received, stopping batch silence after current chunk");
                cancel.cancel();
                batch.await
            }
        };

        let report = joined.map_err(|e| CliError::Command(format!("batch silence task failed: {e}")))??;
        if !report.all_applied() {
            warn!(
                failed = report.failed().count(),
                skipped = report.skipped().count(),
                "batch silence left some events unsilenced"
            );
        }
        format.write(out, &BatchSilenceOutput::from(&report))
    }
}

fn write_transition<W: Write>(
    out: &mut W,
    format: &OutputFormat,
    operation: &str,
    event: AlertEvent,
) -> Result<(), CliError> {
    format.write(
        out,
        &TransitionOutput {
            operation: operation.to_string(),
            event,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use ops_alerts::{
        AlertError, EventStatus, FiringReport, LifecycleConfig, MemoryEventStore, ReportEvent,
    };
    use std::sync::Arc;

    fn context(operator: Option<&str>) -> (AppContext, String) {
        let ctx = AppContext::new(
            Arc::new(MemoryEventStore::new()),
            LifecycleConfig::default(),
            operator.map(str::to_string),
        );
        let event = ctx
            .engine()
            .report_firing(FiringReport::default().label("alertname", "DiskFull"))
            .unwrap();
        (ctx, event.id().to_string())
    }

    #[tokio::test]
    async fn claim_writes_transition() {
        let (ctx, id) = context(Some("alice"));
        let mut out = Vec::new();
        LifecycleCommand::new(&ctx)
            .claim(&mut out, &OutputFormat::new(Format::Table), &id)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("claim"));
        assert!(text.contains("now claimed"));
    }

    #[tokio::test]
    async fn mutating_without_operator_fails() {
        let (ctx, id) = context(None);
        let mut out = Vec::new();
        let result = LifecycleCommand::new(&ctx)
            .claim(&mut out, &OutputFormat::default(), &id)
            .await;
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
        assert_eq!(
            ctx.engine().get_event(&id).unwrap().status(),
            EventStatus::Firing
        );
    }

    #[tokio::test]
    async fn silence_then_unsilence() {
        let (ctx, id) = context(Some("alice"));
        let cmd = LifecycleCommand::new(&ctx);
        let format = OutputFormat::new(Format::Json);
        let mut out = Vec::new();

        cmd.silence(&mut out, &format, &id, Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(
            ctx.engine().get_event(&id).unwrap().status(),
            EventStatus::Silenced
        );

        cmd.unsilence(&mut out, &format, &id).await.unwrap();
        assert_eq!(
            ctx.engine().get_event(&id).unwrap().status(),
            EventStatus::Firing
        );
    }

    #[tokio::test]
    async fn release_by_non_owner_is_conflict() {
        let (ctx, id) = context(Some("bob"));
        ctx.engine().claim(&id, "alice").unwrap();

        let mut out = Vec::new();
        let result = LifecycleCommand::new(&ctx)
            .release(&mut out, &OutputFormat::default(), &id)
            .await;
        assert!(matches!(
            result,
            Err(CliError::Alert(AlertError::Conflict { .. }))
        ));
    }

    #[tokio::test]
    async fn batch_silence_reports_per_id() {
        let (ctx, id) = context(Some("alice"));
        let mut out = Vec::new();
        LifecycleCommand::new(&ctx)
            .batch_silence(
                &mut out,
                &OutputFormat::new(Format::Json),
                &[id.clone(), "missing".to_string()],
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["items"][0]["outcome"], "applied");
        assert_eq!(value["items"][1]["outcome"], "failed");
        assert_eq!(value["items"][1]["error_kind"], "not_found");
        assert_eq!(value["cancelled"], false);
    }
}
