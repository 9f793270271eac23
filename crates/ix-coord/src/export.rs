//! Export document building, encoding and persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ix_core::{PageMeta, Segment, SessionId, consolidate};
use ix_db::{QueueError, Sessions};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Default upper bound on an encoded export.
pub const DEFAULT_MAX_EXPORT_BYTES: usize = 64 * 1024 * 1024;

/// Export failures. The message is the human-readable reason.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no data to export")]
    NoData,
    #[error("export is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Sink {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read sessions: {0}")]
    Queue(#[from] QueueError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub sessions: Vec<ExportedSession>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedSession {
    pub session_id: SessionId,
    pub start_time: DateTime<Utc>,
    pub page_meta: Vec<PageMeta>,
    pub segments: Vec<Segment>,
}

/// Consolidates every session, oldest first.
///
/// Segments without any records, such as one that went idle before the user
/// did anything, are left out.
pub fn build_document(sessions: Sessions, exported_at: DateTime<Utc>) -> ExportDocument {
    let mut sessions: Vec<ExportedSession> = sessions
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(session_id, data)| ExportedSession {
            session_id,
            start_time: data.start_time,
            page_meta: data.page_meta,
            segments: consolidate(data.fragments)
                .into_iter()
                .filter(|segment| !segment.buffers.is_empty())
                .collect(),
        })
        .collect();
    sessions.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
    ExportDocument {
        exported_at,
        sessions,
    }
}

/// Pretty-printed JSON, rejected when larger than `max_bytes`.
pub fn encode(document: &ExportDocument, max_bytes: usize) -> Result<String, ExportError> {
    let text = serde_json::to_string_pretty(document)?;
    if text.len() > max_bytes {
        return Err(ExportError::TooLarge {
            size: text.len(),
            limit: max_bytes,
        });
    }
    Ok(text)
}

pub fn export_filename(at: DateTime<Utc>) -> String {
    format!("ix_export_{}.json", at.format("%Y-%m-%dT%H-%M-%S"))
}

/// Host collaborator that persists an encoded export.
pub trait ExportSink: Send + Sync {
    /// Saves `contents` and returns where it went.
    fn save(&self, filename: &str, contents: &str) -> Result<PathBuf, ExportError>;
}

/// Writes exports into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for DirectorySink {
    fn save(&self, filename: &str, contents: &str) -> Result<PathBuf, ExportError> {
        let sink_error = |path: &Path| {
            let path = path.display().to_string();
            move |source| ExportError::Sink { path, source }
        };
        std::fs::create_dir_all(&self.dir).map_err(sink_error(&self.dir))?;
        let path = self.dir.join(filename);
        std::fs::write(&path, contents).map_err(sink_error(&path))?;
        Ok(path)
    }
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReceipt {
    pub filename: String,
    pub path: PathBuf,
    pub bytes: usize,
    pub sessions: usize,
    pub segments: usize,
}
