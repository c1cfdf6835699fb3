//! CLI command implementations.
//!
//! - [`events`] - Listing, counting, and inspecting events
//! - [`lifecycle`] - Claims and silences
//! - [`ingest`] - Firing and resolution reports

pub mod events;
pub mod ingest;
pub mod lifecycle;

pub use events::EventsCommand;
pub use ingest::IngestCommand;
pub use lifecycle::LifecycleCommand;
