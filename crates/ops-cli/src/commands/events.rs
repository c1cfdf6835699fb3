//! Read-only event commands: list, count, summary, get.

use std::io::Write;

use ops_alerts::{EventFilter, Page};

use crate::cli::{FilterArgs, ListArgs};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::{CountOutput, OutputFormat};

/// Handler for read-only event commands.
pub struct EventsCommand<'a> {
    ctx: &'a AppContext,
}

impl<'a> EventsCommand<'a> {
    /// Creates a new handler.
    #[must_use]
    pub const fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Lists one page of events.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ListArgs,
    ) -> Result<(), CliError> {
        let filter = build_filter(&args.filter);
        let page = args.page_size.map_or_else(
            || Page::new(args.page, self.ctx.engine().config().default_page_size),
            |size| Page::new(args.page, size),
        );

        let result = self.ctx.queries().list(&filter, Some(page))?;
        format.write(out, &result)
    }

    /// Counts matching events.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn count<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &FilterArgs,
    ) -> Result<(), CliError> {
        let count = self.ctx.queries().count(&build_filter(args))?;
        format.write(out, &CountOutput { count })
    }

    /// Shows per-status counts.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn summary<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let counts = self.ctx.queries().status_counts()?;
        format.write(out, &counts)
    }

    /// Shows one event.
    ///
    /// # Errors
    ///
    /// Returns error if the event does not exist.
    pub async fn get<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        id: &str,
    ) -> Result<(), CliError> {
        let event = self.ctx.engine().get_event(id)?;
        format.write(out, &event)
    }
}

/// Turns filter flags into an [`EventFilter`].
#[must_use]
pub fn build_filter(args: &FilterArgs) -> EventFilter {
    let mut filter = EventFilter::all().within(args.since, args.until);
    if let Some(status) = args.status {
        filter = filter.with_status(status);
    }
    for (key, value) in &args.label {
        filter = filter.with_label(key, value);
    }
    if let Some(fingerprint) = &args.fingerprint {
        filter = filter.with_fingerprint(fingerprint);
    }
    if let Some(term) = &args.search {
        filter = filter.with_search(term);
    }
    filter
}
