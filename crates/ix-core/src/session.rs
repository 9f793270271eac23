//! Stored recording sessions and aggregate counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fragment::{Fragment, PageMeta};

/// Everything stored for one recording session.
///
/// Fragments and page metadata are kept in arrival order; consolidation into
/// segments happens at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub fragments: Vec<Fragment>,
    #[serde(default)]
    pub page_meta: Vec<PageMeta>,
}

impl SessionData {
    pub const fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            fragments: Vec::new(),
            page_meta: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.page_meta.is_empty()
    }
}

/// Running totals across all pages of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub pointer: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub keys: u64,
    #[serde(default)]
    pub scrolls: u64,
    #[serde(default)]
    pub segments: u64,
}

impl Counters {
    /// Adds a fragment's records to the totals.
    ///
    /// A segment is counted once, on its terminal fragment, if any of its
    /// flushes carried records. Segments that never captured anything, and
    /// the empty terminal flush of a stop issued while already idle, are not
    /// counted.
    pub fn record(&mut self, fragment: &Fragment) {
        let lengths = fragment.buffers.lengths();
        self.pointer += lengths.pointer as u64;
        self.clicks += lengths.clicks as u64;
        self.keys += lengths.keys as u64;
        self.scrolls += lengths.scrolls as u64;
        if fragment.terminal && fragment.had_records {
            self.segments += 1;
        }
    }

    pub const fn events(&self) -> u64 {
        self.pointer + self.clicks + self.keys + self.scrolls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ScrollSample;
    use crate::fragment::Buffers;
    use crate::types::{SegmentId, SessionId};

    fn fragment(terminal: bool, had_records: bool, scrolls: usize) -> Fragment {
        let mut buffers = Buffers::default();
        for t in 0..scrolls {
            buffers.scrolls.push(ScrollSample {
                t: t as u64,
                x: 0.0,
                y: 0.0,
                dx: 0.0,
                dy: 0.0,
                dt_since_last: None,
            });
        }
        Fragment {
            session_id: SessionId::new("s").unwrap(),
            segment_id: SegmentId::FIRST,
            page_url: "https://a.test/".into(),
            host: "a.test".into(),
            timestamp: Utc::now(),
            terminal,
            had_records,
            buffers,
        }
    }

    #[test]
    fn counters_sum_records_and_count_terminal_segments() {
        let mut counters = Counters::default();
        counters.record(&fragment(false, true, 3));
        counters.record(&fragment(true, true, 2));
        counters.record(&fragment(true, false, 0));

        assert_eq!(counters.scrolls, 5);
        assert_eq!(counters.events(), 5);
        assert_eq!(counters.segments, 1);
    }

    #[test]
    fn segment_drained_by_periodic_flush_counts_on_empty_terminal() {
        let mut counters = Counters::default();
        counters.record(&fragment(false, true, 3));
        assert_eq!(counters.segments, 0);

        counters.record(&fragment(true, true, 0));
        assert_eq!(counters.scrolls, 3);
        assert_eq!(counters.segments, 1);
    }

    #[test]
    fn session_data_tolerates_missing_lists() {
        let parsed: SessionData =
            serde_json::from_str(r#"{"start_time":"2025-01-01T00:00:00Z"}"#).unwrap();
        assert!(parsed.is_empty());
    }
}
