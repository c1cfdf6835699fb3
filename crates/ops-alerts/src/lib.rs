//! Alert event lifecycle management for operators.
//!
//! `ops-alerts` tracks fired alert events through their lifecycle and enforces
//! who may act on them and when.
//!
//! # Features
//!
//! - **Claims**: an operator takes exclusive ownership of a firing event
//! - **Silences**: suppress an event until a deadline; lapsed silences revert
//!   to firing on the next read
//! - **Batch silences**: per-id outcomes, cancellable between chunks
//! - **Queries**: filtered, paginated listings and per-status counts
//! - **Ingestion hand-off**: firing/resolved reports via [`ReportEvent`]
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use ops_alerts::{
//!     EventFilter, EventStatus, FiringReport, LifecycleConfig, LifecycleEngine,
//!     MemoryEventStore, QueryFacade, ReportEvent,
//! };
//!
//! let store = Arc::new(MemoryEventStore::new());
//! let config = LifecycleConfig::default();
//! let engine = LifecycleEngine::new(store.clone(), config.clone());
//! let queries = QueryFacade::new(store, config);
//!
//! // The ingestion pipeline reports a firing condition.
//! let event = engine
//!     .report_firing(
//!         FiringReport::default()
//!             .label("alertname", "HighCPU")
//!             .label("instance", "node-1"),
//!     )
//!     .unwrap();
//!
//! // An operator claims it, then silences it for an hour.
//! engine.claim(event.id(), "alice").unwrap();
//! let silenced = engine
//!     .silence(event.id(), Duration::from_secs(3600), "alice")
//!     .unwrap();
//! assert_eq!(silenced.status(), EventStatus::Silenced);
//!
//! let filter = EventFilter::all().with_status(EventStatus::Silenced);
//! assert_eq!(queries.count(&filter).unwrap(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod batch;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod ingest;
pub mod query;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use batch::{BatchItem, BatchOutcome, BatchReport, CancelFlag};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{parse_duration, LifecycleConfig};
pub use engine::LifecycleEngine;
pub use error::{AlertError, Result};
pub use guard::OwnershipGuard;
pub use ingest::ReportEvent;
pub use query::{EventFilter, Page, PageResult, QueryFacade, StatusCounts};
pub use store::{EventStore, MemoryEventStore};
pub use types::{
    compute_fingerprint, AlertEvent, AlertSeverity, EventState, EventStatus, FiringReport,
    StateMutation, ALERTNAME_LABEL,
};
