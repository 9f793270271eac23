//! Storage layer for ix.
//!
//! Sessions and the recording-state mirror are JSON documents in a key-value
//! [`Store`]. [`SqliteStore`] keeps them in a single `kv` table using
//! `rusqlite`; [`MemoryStore`] is the in-process variant used by tests.
//!
//! # Thread Safety
//!
//! A store is `Send` but not `Sync`. All access from the coordinator goes
//! through the [`WriteQueue`], which owns the store on a dedicated thread and
//! runs one operation at a time.

pub mod schema;
mod store;
mod write_queue;

pub use schema::{Append, RecordingState, Sessions};
pub use store::{FailureInjector, MemoryStore, SqliteStore, Store, StoreError};
pub use write_queue::{QueueError, WritePolicy, WriteQueue};
