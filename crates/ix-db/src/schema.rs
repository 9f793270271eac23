//! Persisted document layout.
//!
//! ## Keys
//!
//! - `sessions`: map of session id to [`SessionData`].
//! - `recording_state`: [`RecordingState`], the durable mirror of the
//!   coordinator's recording flag, session id and counters.
//!
//! Every append is a whole-document read-modify-write of `sessions`. Callers
//! must serialize them through the write queue.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use ix_core::{Counters, Fragment, PageMeta, SessionData, SessionId};

use crate::store::{Store, StoreError};

pub const SESSIONS_KEY: &str = "sessions";
pub const RECORDING_STATE_KEY: &str = "recording_state";

pub type Sessions = BTreeMap<SessionId, SessionData>;

/// Durable mirror of the coordinator state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingState {
    #[serde(default)]
    pub recording: bool,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub counters: Counters,
}

/// Outcome of an append against the stored sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    Stored,
    /// The target session does not exist; nothing was written.
    MissingSession,
}

fn load<T: DeserializeOwned + Default>(store: &dyn Store, key: &str) -> Result<T, StoreError> {
    store
        .get(key)?
        .map(|value| {
            serde_json::from_value(value).map_err(|source| StoreError::Json {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
        .map(Option::unwrap_or_default)
}

fn save<T: Serialize>(store: &mut dyn Store, key: &str, value: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|source| StoreError::Json {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &value)
}

pub fn load_sessions(store: &dyn Store) -> Result<Sessions, StoreError> {
    load(store, SESSIONS_KEY)
}

pub fn save_sessions(store: &mut dyn Store, sessions: &Sessions) -> Result<(), StoreError> {
    save(store, SESSIONS_KEY, sessions)
}

pub fn load_recording_state(store: &dyn Store) -> Result<RecordingState, StoreError> {
    load(store, RECORDING_STATE_KEY)
}

pub fn save_recording_state(
    store: &mut dyn Store,
    state: &RecordingState,
) -> Result<(), StoreError> {
    save(store, RECORDING_STATE_KEY, state)
}

/// Adds an empty session. An existing session with the same id is kept.
pub fn create_session(
    store: &mut dyn Store,
    session_id: &SessionId,
    start_time: DateTime<Utc>,
) -> Result<(), StoreError> {
    let mut sessions = load_sessions(store)?;
    if sessions.contains_key(session_id) {
        return Ok(());
    }
    sessions.insert(session_id.clone(), SessionData::new(start_time));
    save_sessions(store, &sessions)
}

pub fn append_fragment(store: &mut dyn Store, fragment: &Fragment) -> Result<Append, StoreError> {
    let mut sessions = load_sessions(store)?;
    let Some(session) = sessions.get_mut(&fragment.session_id) else {
        return Ok(Append::MissingSession);
    };
    session.fragments.push(fragment.clone());
    save_sessions(store, &sessions)?;
    Ok(Append::Stored)
}

pub fn append_page_meta(store: &mut dyn Store, meta: &PageMeta) -> Result<Append, StoreError> {
    let mut sessions = load_sessions(store)?;
    let Some(session) = sessions.get_mut(&meta.session_id) else {
        return Ok(Append::MissingSession);
    };
    session.page_meta.push(meta.clone());
    save_sessions(store, &sessions)?;
    Ok(Append::Stored)
}

/// Erases every stored session.
pub fn clear_sessions(store: &mut dyn Store) -> Result<(), StoreError> {
    store.remove(SESSIONS_KEY)
}
