//! Authoritative recording state and its durable mirror.

use ix_core::{Counters, Fragment, SessionId};
use ix_db::schema::{self, RecordingState};
use ix_db::{QueueError, WriteQueue};

/// Recording flag, session id and counters of this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorState {
    pub recording: bool,
    pub session_id: Option<SessionId>,
    pub counters: Counters,
}

impl CoordinatorState {
    /// Reads the mirror, in queue order.
    pub async fn load(queue: &WriteQueue) -> Result<Self, QueueError> {
        let mirror = queue
            .execute(|store| schema::load_recording_state(store))
            .await?;
        Ok(Self::from(mirror))
    }

    /// Queues a write of the current state to the mirror.
    pub fn save(&self, queue: &WriteQueue) -> Result<(), QueueError> {
        let mirror = RecordingState::from(self.clone());
        queue.enqueue("save_recording_state", move |store| {
            schema::save_recording_state(store, &mirror)
        })
    }

    /// Counts a fragment if it belongs to the current session.
    pub fn record(&mut self, fragment: &Fragment) -> bool {
        if self.session_id.as_ref() != Some(&fragment.session_id) {
            return false;
        }
        self.counters.record(fragment);
        true
    }
}

impl From<RecordingState> for CoordinatorState {
    fn from(mirror: RecordingState) -> Self {
        Self {
            recording: mirror.recording,
            session_id: mirror.session_id,
            counters: mirror.counters,
        }
    }
}

impl From<CoordinatorState> for RecordingState {
    fn from(state: CoordinatorState) -> Self {
        Self {
            recording: state.recording,
            session_id: state.session_id,
            counters: state.counters,
        }
    }
}

/// State slot that loads from the mirror on first use.
#[derive(Debug, Default)]
pub(crate) struct StateSlot {
    loaded: bool,
    state: CoordinatorState,
}

impl StateSlot {
    /// Loads the state unless it was loaded before, then returns it.
    pub async fn ensure_loaded(
        &mut self,
        queue: &WriteQueue,
    ) -> Result<&mut CoordinatorState, QueueError> {
        if !self.loaded {
            self.state = CoordinatorState::load(queue).await?;
            self.loaded = true;
            tracing::debug!(
                recording = self.state.recording,
                session = ?self.state.session_id,
                "coordinator state loaded"
            );
        }
        Ok(&mut self.state)
    }
}
