//! Recording coordinator for ix.
//!
//! Owns the recording state, fans control out to connected pages, funnels
//! their fragments into the write queue and consolidates stored sessions
//! for export.

mod coordinator;
pub mod export;
pub mod link;
pub mod runtime;
mod state;

pub use coordinator::{
    CoordError, Coordinator, CoordinatorConfig, DEFAULT_PRIVILEGED_SCHEMES, PageReport,
    StatusReport,
};
pub use export::{DirectorySink, ExportError, ExportReceipt, ExportSink};
pub use link::{Control, Envelope, Inbox, PageLink};
pub use runtime::{PageTask, VirtualPage, spawn_page};
pub use state::CoordinatorState;
