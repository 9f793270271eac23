//! Export-time merge of stored fragments into logical segments.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fragment::{Buffers, Fragment};
use crate::types::SegmentId;

/// A contiguous span of activity on one page, rebuilt from its fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: SegmentId,
    pub page_url: String,
    pub host: String,
    /// Timestamp of the first fragment.
    pub start: DateTime<Utc>,
    /// Timestamp of the last fragment.
    pub end: DateTime<Utc>,
    /// Whether the segment's terminal fragment was received.
    pub complete: bool,
    pub fragment_count: usize,
    pub buffers: Buffers,
}

impl From<Fragment> for Segment {
    fn from(fragment: Fragment) -> Self {
        Self {
            segment_id: fragment.segment_id,
            page_url: fragment.page_url,
            host: fragment.host,
            start: fragment.timestamp,
            end: fragment.timestamp,
            complete: fragment.terminal,
            fragment_count: 1,
            buffers: fragment.buffers,
        }
    }
}

impl Segment {
    fn absorb(&mut self, later: Self) {
        self.end = later.end;
        self.complete = later.complete;
        self.fragment_count += later.fragment_count;
        self.buffers.append(later.buffers);
    }
}

/// Incremental merger. Each page has at most one open segment; a piece with
/// the same segment id extends it, anything else starts a new one. A complete
/// segment is never extended.
#[derive(Debug, Default)]
struct Merger {
    segments: Vec<Segment>,
    open: HashMap<String, usize>,
}

impl Merger {
    fn push(&mut self, piece: Segment) {
        if let Some(&index) = self.open.get(&piece.page_url) {
            let current = &mut self.segments[index];
            if current.segment_id == piece.segment_id && !current.complete {
                current.absorb(piece);
                return;
            }
        }
        self.open.insert(piece.page_url.clone(), self.segments.len());
        self.segments.push(piece);
    }
}

/// Merges fragments, in arrival order, into segments ordered by their first
/// fragment.
///
/// A run ends at its terminal fragment. A reloaded page restarts its segment
/// ids in the same session, so a later fragment reusing a closed id begins a
/// new segment instead of extending the closed one.
pub fn consolidate(fragments: impl IntoIterator<Item = Fragment>) -> Vec<Segment> {
    coalesce(fragments.into_iter().map(Segment::from))
}

/// Applies the same merge to already consolidated segments.
///
/// `coalesce(consolidate(a) ++ consolidate(b)) == consolidate(a ++ b)`, so
/// fragments can be consolidated in batches of any size.
pub fn coalesce(segments: impl IntoIterator<Item = Segment>) -> Vec<Segment> {
    let mut merger = Merger::default();
    for segment in segments {
        merger.push(segment);
    }
    merger.segments
}
