//! Wiring from command-line flags to the lifecycle engine and query facade.

use std::sync::Arc;

use ops_alerts::{EventStore, LifecycleConfig, LifecycleEngine, MemoryEventStore, QueryFacade};
use tracing::debug;

use crate::cli::Cli;
use crate::error::CliError;

/// Everything a command needs to run.
#[derive(Debug, Clone)]
pub struct AppContext {
    engine: LifecycleEngine,
    queries: QueryFacade,
    operator: Option<String>,
}

impl AppContext {
    /// Loads configuration and opens the event store named by `cli`.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the configuration file is unreadable or
    /// invalid, and `CliError::Alert` if the state directory cannot be opened.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config = match &cli.config {
            Some(path) => LifecycleConfig::from_json_file(path)
                .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?,
            None => LifecycleConfig::default(),
        };

        let store = MemoryEventStore::persistent(&cli.state_dir)?.with_timeout(config.store_timeout());
        debug!(
            state_dir = %cli.state_dir.display(),
            persistent = store.is_persistent(),
            "opened alert event store"
        );

        Ok(Self::new(Arc::new(store), config, cli.operator.clone()))
    }

    /// Builds a context over an existing store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, config: LifecycleConfig, operator: Option<String>) -> Self {
        Self {
            engine: LifecycleEngine::new(store.clone(), config.clone()),
            queries: QueryFacade::new(store, config),
            operator,
        }
    }

    /// The lifecycle engine.
    #[must_use]
    pub const fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    /// The query facade.
    #[must_use]
    pub const fn queries(&self) -> &QueryFacade {
        &self.queries
    }

    /// The operator for mutating commands.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidArgument` if no operator was given.
    pub fn operator(&self) -> Result<&str, CliError> {
        self.operator
            .as_deref()
            .filter(|op| !op.trim().is_empty())
            .ok_or_else(|| {
                CliError::InvalidArgument(
                    "this command needs an operator (--operator or OPSCTL_OPERATOR)".to_string(),
                )
            })
    }
}
