//! Flush payloads and the page → coordinator message contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Host, Url};

use crate::event::{ClickRecord, KeyRecord, PointerSample, ScrollSample};
use crate::event_kind::EventKind;
use crate::hints::{ClientHints, NetworkInfo};
use crate::types::{SegmentId, SessionId};

/// Per-kind event buffers of one page.
///
/// Append-only between flushes. [`Buffers::drain`] hands the whole contents to
/// the caller and leaves the buffers empty in the same step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buffers {
    #[serde(default)]
    pub pointer: Vec<PointerSample>,
    #[serde(default)]
    pub clicks: Vec<ClickRecord>,
    #[serde(default)]
    pub keys: Vec<KeyRecord>,
    #[serde(default)]
    pub scrolls: Vec<ScrollSample>,
}

impl Buffers {
    pub fn is_empty(&self) -> bool {
        self.pointer.is_empty()
            && self.clicks.is_empty()
            && self.keys.is_empty()
            && self.scrolls.is_empty()
    }

    pub fn len_of(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Pointer => self.pointer.len(),
            EventKind::Click => self.clicks.len(),
            EventKind::Key => self.keys.len(),
            EventKind::Scroll => self.scrolls.len(),
        }
    }

    pub fn lengths(&self) -> BufferLengths {
        BufferLengths {
            pointer: self.pointer.len(),
            clicks: self.clicks.len(),
            keys: self.keys.len(),
            scrolls: self.scrolls.len(),
        }
    }

    /// Takes every buffered record, leaving all buffers empty.
    #[must_use]
    pub fn drain(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Appends `other` after the records already held, per kind.
    pub fn append(&mut self, other: Self) {
        self.pointer.extend(other.pointer);
        self.clicks.extend(other.clicks);
        self.keys.extend(other.keys);
        self.scrolls.extend(other.scrolls);
    }
}

/// Number of records per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferLengths {
    pub pointer: usize,
    pub clicks: usize,
    pub keys: usize,
    pub scrolls: usize,
}

/// One flush's worth of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub session_id: SessionId,
    pub segment_id: SegmentId,
    pub page_url: String,
    pub host: String,
    /// Wall-clock time of the flush.
    pub timestamp: DateTime<Utc>,
    /// Set on the flush that ends the segment.
    pub terminal: bool,
    /// Whether this or an earlier flush of the same segment carried records.
    /// A terminal fragment can be empty after a periodic flush drained the
    /// segment, so this is what decides whether the segment counts.
    #[serde(default)]
    pub had_records: bool,
    pub buffers: Buffers,
}

/// Environment snapshot sent once per (session, page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub session_id: SessionId,
    pub url: String,
    pub host: String,
    pub client_hints: ClientHints,
    pub network_info: NetworkInfo,
    pub timestamp: DateTime<Utc>,
}

/// One-way notifications from a page to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum PageMessage {
    /// The page context (re)initialized and wants the current recording state.
    Ready,
    Fragment(Fragment),
    PageMeta(PageMeta),
}

/// Page → coordinator delivery failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The coordinator end is gone.
    #[error("coordinator disconnected")]
    Disconnected,
}

/// One-way, at-most-once delivery to the coordinator.
pub trait Transport: Send {
    fn send(&self, message: PageMessage) -> Result<(), TransportError>;
}

/// Transport that keeps every message in memory. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<PageMessage>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later send fail, as if the coordinator went away.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<PageMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fragments(&self) -> Vec<Fragment> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                PageMessage::Fragment(fragment) => Some(fragment),
                _ => None,
            })
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, message: PageMessage) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}

/// Extracts the host part of a URL, or an empty string when there is none.
///
/// Domains come back lowercased and IDNA-encoded; IPv6 literals without
/// brackets.
pub fn host_of(url: &str) -> String {
    let Ok(url) = Url::parse(url) else {
        return String::new();
    };
    match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(t: u64) -> ClickRecord {
        ClickRecord {
            t,
            x: 1.0,
            y: 2.0,
            button: 0,
            target: crate::event::TargetDescriptor {
                tag: "a".into(),
                id: None,
                text: None,
            },
            dt_since_last: None,
        }
    }

    #[test]
    fn drain_empties_buffers_and_returns_everything() {
        let mut buffers = Buffers::default();
        buffers.clicks.push(click(1));
        buffers.clicks.push(click(2));
        let before = buffers.clone();

        let drained = buffers.drain();

        assert_eq!(drained, before);
        assert!(buffers.is_empty());
    }

    #[test]
    fn append_preserves_order() {
        let mut first = Buffers::default();
        first.clicks.push(click(1));
        let mut second = Buffers::default();
        second.clicks.push(click(2));

        first.append(second);

        let times: Vec<u64> = first.clicks.iter().map(|c| c.t).collect();
        assert_eq!(times, vec![1, 2]);
        assert_eq!(first.len_of(EventKind::Click), 2);
        assert_eq!(first.lengths().clicks, 2);
    }

    #[test]
    fn closed_memory_transport_rejects_sends() {
        let transport = MemoryTransport::new();
        transport.send(PageMessage::Ready).unwrap();
        transport.close();
        assert_eq!(
            transport.send(PageMessage::Ready),
            Err(TransportError::Disconnected)
        );
        assert_eq!(transport.messages().len(), 1);
    }

    #[test]
    fn host_of_handles_common_shapes() {
        assert_eq!(host_of("https://Example.com/path?q=1"), "example.com");
        assert_eq!(host_of("http://user:pw@host.test:8080/"), "host.test");
        assert_eq!(host_of("http://[::1]:3000/x"), "::1");
        assert_eq!(host_of("about:blank"), "");
        assert_eq!(host_of("file:///tmp/a.html"), "");
        assert_eq!(host_of("not a url"), "");
    }

    #[test]
    fn host_of_normalizes_encoded_and_international_hosts() {
        assert_eq!(host_of("https://B%C3%BCcher.example/"), "xn--bcher-kva.example");
        assert_eq!(host_of("https://Bücher.example/"), "xn--bcher-kva.example");
        assert_eq!(host_of("http://127.0.0.1:8080/"), "127.0.0.1");
    }
}
