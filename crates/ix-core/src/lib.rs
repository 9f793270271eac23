//! Core domain logic for interaction telemetry.
//!
//! This crate contains the fundamental types and logic for:
//! - Capture: normalizing raw pointer, click, key and scroll input
//! - Segmentation: the per-page idle-detection state machine and its flushes
//! - Consolidation: merging stored fragments back into segments

pub mod capture;
pub mod clock;
mod consolidate;
pub mod event;
pub mod event_kind;
pub mod fragment;
pub mod hints;
pub mod keys;
pub mod segmenter;
pub mod session;
pub mod types;

pub use capture::{CaptureHost, ListenerSet};
pub use clock::{Clock, Scheduler, SystemClock, Timer, TimerId, TimerTable, VirtualClock};
pub use consolidate::{Segment, coalesce, consolidate};
pub use event::{ElementInfo, RawInput};
pub use event_kind::{EventKind, UnknownEventKind};
pub use fragment::{
    BufferLengths, Buffers, Fragment, MemoryTransport, PageMessage, PageMeta, Transport,
    TransportError, host_of,
};
pub use hints::{ClientHints, HintsSource, NetworkInfo, StaticHints};
pub use keys::AllowedKey;
pub use segmenter::{CaptureConfig, PagePorts, PageState, PageStatus, Segmenter};
pub use session::{Counters, SessionData};
pub use types::{PageId, SegmentId, SessionId, ValidationError};
