//! Process-wide control plane.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use ix_core::{
    Counters, Fragment, PageId, PageMessage, PageMeta, PageStatus, SessionId, ValidationError,
};
use ix_db::schema::{self, Append};
use ix_db::{QueueError, WriteQueue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::export::{self, ExportError, ExportReceipt, ExportSink};
use crate::link::{ChannelTransport, Control, Envelope, Inbox, PageHandle, PageLink, is_privileged};
use crate::state::{CoordinatorState, StateSlot};

/// Coordinator errors.
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("store queue failed: {0}")]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Schemes of the host's internal pages, which are never recorded.
pub const DEFAULT_PRIVILEGED_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "about",
    "edge",
    "moz-extension",
    "devtools",
    "view-source",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub privileged_schemes: Vec<String>,
    pub max_export_bytes: usize,
    /// How long to wait for each page's status reply.
    pub status_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            privileged_schemes: DEFAULT_PRIVILEGED_SCHEMES
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_export_bytes: export::DEFAULT_MAX_EXPORT_BYTES,
            status_timeout_ms: 1000,
        }
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub recording: bool,
    pub session_id: Option<SessionId>,
    pub counters: Counters,
    pub segments: u64,
}

/// One page's reply to a status fan-out. `status` is `None` when the page
/// did not answer in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub page_id: PageId,
    pub url: String,
    pub status: Option<PageStatus>,
}

pub struct Coordinator {
    queue: WriteQueue,
    config: CoordinatorConfig,
    state: tokio::sync::Mutex<StateSlot>,
    pages: Mutex<HashMap<PageId, PageHandle>>,
    inbound: mpsc::UnboundedSender<Envelope>,
    next_page: AtomicU64,
}

impl Coordinator {
    /// Creates a coordinator over `queue`. Page messages arrive in the
    /// returned [`Inbox`]; feed them to [`Coordinator::serve`] or
    /// [`Coordinator::pump`].
    pub fn new(queue: WriteQueue, config: CoordinatorConfig) -> (Arc<Self>, Inbox) {
        let (inbound, receiver) = mpsc::unbounded_channel();
        let coordinator = Arc::new(Self {
            queue,
            config,
            state: tokio::sync::Mutex::new(StateSlot::default()),
            pages: Mutex::new(HashMap::new()),
            inbound,
            next_page: AtomicU64::new(1),
        });
        (coordinator, Inbox::new(receiver))
    }

    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn pages(&self) -> MutexGuard<'_, HashMap<PageId, PageHandle>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a page context and returns its end of the channels.
    pub fn connect(&self, url: impl Into<String>) -> Result<PageLink, CoordError> {
        let url = url.into();
        let n = self.next_page.fetch_add(1, Ordering::Relaxed);
        let id = PageId::new(format!("page-{n}"))?;
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        self.pages().insert(
            id.clone(),
            PageHandle {
                url: url.clone(),
                control: control_tx,
            },
        );
        tracing::debug!(page = %id, url = %url, "page connected");
        Ok(PageLink {
            transport: ChannelTransport::new(id.clone(), self.inbound.clone()),
            id,
            url,
            control: control_rx,
        })
    }

    pub fn disconnect(&self, page: &PageId) {
        if self.pages().remove(page).is_some() {
            tracing::debug!(page = %page, "page disconnected");
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages().len()
    }

    /// Handles page messages until every page link and the coordinator are gone.
    pub async fn serve(self: Arc<Self>, mut inbox: Inbox) {
        while let Some(envelope) = inbox.recv().await {
            if let Err(e) = self.handle(envelope).await {
                tracing::warn!(error = %e, "failed to handle page message");
            }
        }
    }

    /// Handles every page message already waiting in `inbox`.
    pub async fn pump(&self, inbox: &mut Inbox) -> Result<usize, CoordError> {
        let mut handled = 0;
        while let Some(envelope) = inbox.try_recv() {
            self.handle(envelope).await?;
            handled += 1;
        }
        Ok(handled)
    }

    pub async fn handle(&self, envelope: Envelope) -> Result<(), CoordError> {
        let Envelope { page, message } = envelope;
        match message {
            PageMessage::Ready => self.on_ready(&page).await,
            PageMessage::Fragment(fragment) => self.on_fragment(fragment).await,
            PageMessage::PageMeta(meta) => self.on_page_meta(meta).await,
        }
    }

    async fn on_ready(&self, page: &PageId) -> Result<(), CoordError> {
        let mut slot = self.state.lock().await;
        let state = slot.ensure_loaded(&self.queue).await?;
        let Some(session_id) = state.session_id.clone().filter(|_| state.recording) else {
            return Ok(());
        };
        let handle = self.pages().get(page).cloned();
        if let Some(handle) = handle {
            if !is_privileged(&handle.url, &self.config.privileged_schemes)
                && !handle.send(Control::Start(session_id))
            {
                self.disconnect(page);
            }
        }
        Ok(())
    }

    async fn on_fragment(&self, fragment: Fragment) -> Result<(), CoordError> {
        let mut slot = self.state.lock().await;
        let state = slot.ensure_loaded(&self.queue).await?;
        if state.record(&fragment) {
            state.save(&self.queue)?;
        }
        self.queue.enqueue("append_fragment", move |store| {
            if schema::append_fragment(store, &fragment)? == Append::MissingSession {
                tracing::debug!(session = %fragment.session_id, "fragment for unknown session dropped");
            }
            Ok(())
        })?;
        Ok(())
    }

    async fn on_page_meta(&self, meta: PageMeta) -> Result<(), CoordError> {
        self.state.lock().await.ensure_loaded(&self.queue).await?;
        self.queue.enqueue("append_page_meta", move |store| {
            if schema::append_page_meta(store, &meta)? == Append::MissingSession {
                tracing::debug!(session = %meta.session_id, "page meta for unknown session dropped");
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Starts a new session unless one is already recording.
    pub async fn begin(&self) -> Result<SessionId, CoordError> {
        let mut slot = self.state.lock().await;
        let state = slot.ensure_loaded(&self.queue).await?;
        if let (true, Some(session_id)) = (state.recording, &state.session_id) {
            return Ok(session_id.clone());
        }

        let session_id = SessionId::new(Uuid::new_v4().to_string())?;
        *state = CoordinatorState {
            recording: true,
            session_id: Some(session_id.clone()),
            counters: Counters::default(),
        };
        let created = session_id.clone();
        let start_time = Utc::now();
        self.queue.enqueue("create_session", move |store| {
            schema::create_session(store, &created, start_time)
        })?;
        state.save(&self.queue)?;
        tracing::info!(session = %session_id, "recording started");

        self.broadcast(|| Control::Start(session_id.clone()));
        Ok(session_id)
    }

    /// Stops recording. The session id is kept for status reporting.
    pub async fn end(&self) -> Result<(), CoordError> {
        let mut slot = self.state.lock().await;
        let state = slot.ensure_loaded(&self.queue).await?;
        if !state.recording {
            return Ok(());
        }
        state.recording = false;
        state.save(&self.queue)?;
        tracing::info!(session = ?state.session_id, "recording stopped");
        self.broadcast(|| Control::Stop);
        Ok(())
    }

    pub async fn status(&self) -> Result<StatusReport, CoordError> {
        let mut slot = self.state.lock().await;
        let state = slot.ensure_loaded(&self.queue).await?;
        Ok(StatusReport {
            recording: state.recording,
            session_id: state.session_id.clone(),
            counters: state.counters,
            segments: state.counters.segments,
        })
    }

    /// Erases all sessions and resets counters, stopping recording first.
    pub async fn clear(&self) -> Result<(), CoordError> {
        self.end().await?;
        let mut slot = self.state.lock().await;
        let state = slot.ensure_loaded(&self.queue).await?;
        self.queue.execute(|store| schema::clear_sessions(store)).await?;
        *state = CoordinatorState::default();
        state.save(&self.queue)?;
        self.queue.barrier().await?;
        tracing::info!("all sessions cleared");
        Ok(())
    }

    /// Consolidates every stored session and hands the document to `sink`.
    pub async fn export(&self, sink: &dyn ExportSink) -> Result<ExportReceipt, ExportError> {
        self.state.lock().await.ensure_loaded(&self.queue).await?;
        let sessions = self
            .queue
            .execute(|store| schema::load_sessions(store))
            .await?;
        if sessions.is_empty() {
            return Err(ExportError::NoData);
        }

        let exported_at = Utc::now();
        let document = export::build_document(sessions, exported_at);
        let text = export::encode(&document, self.config.max_export_bytes)?;
        let filename = export::export_filename(exported_at);
        let path = sink.save(&filename, &text)?;
        tracing::info!(path = %path.display(), bytes = text.len(), "export written");
        Ok(ExportReceipt {
            filename,
            path,
            bytes: text.len(),
            sessions: document.sessions.len(),
            segments: document.sessions.iter().map(|s| s.segments.len()).sum(),
        })
    }

    /// Asks every live page for its status.
    pub async fn page_statuses(&self) -> Vec<PageReport> {
        let timeout = Duration::from_millis(self.config.status_timeout_ms);
        let mut pending = Vec::new();
        let mut gone = Vec::new();
        for (page_id, handle) in self.pages().iter() {
            let (reply_tx, reply_rx) = oneshot::channel();
            if handle.send(Control::Status(reply_tx)) {
                pending.push((page_id.clone(), handle.url.clone(), reply_rx));
            } else {
                gone.push(page_id.clone());
            }
        }
        for page in &gone {
            self.disconnect(page);
        }

        let mut reports = Vec::with_capacity(pending.len());
        for (page_id, url, reply_rx) in pending {
            let status = tokio::time::timeout(timeout, reply_rx)
                .await
                .ok()
                .and_then(Result::ok);
            if status.is_none() {
                tracing::debug!(page = %page_id, "page did not answer status request");
            }
            reports.push(PageReport {
                page_id,
                url,
                status,
            });
        }
        reports.sort_by(|a, b| a.page_id.cmp(&b.page_id));
        reports
    }

    /// Waits until every write queued so far is durable.
    pub async fn drain(&self) -> Result<(), CoordError> {
        self.queue.barrier().await?;
        Ok(())
    }

    fn broadcast(&self, command: impl Fn() -> Control) {
        let mut gone = Vec::new();
        {
            let pages = self.pages();
            for (page_id, handle) in pages.iter() {
                if is_privileged(&handle.url, &self.config.privileged_schemes) {
                    tracing::debug!(page = %page_id, url = %handle.url, "skipping privileged page");
                    continue;
                }
                if !handle.send(command()) {
                    gone.push(page_id.clone());
                }
            }
        }
        for page in &gone {
            self.disconnect(page);
        }
    }
}
