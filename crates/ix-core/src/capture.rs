//! Capture listeners and the normalizers that turn raw input into records.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::event::{ClickRecord, ElementInfo, KeyRecord, PointerSample, ScrollSample, TargetDescriptor};
use crate::event_kind::EventKind;
use crate::keys::{self, KeyClass};

/// Host capability for attaching and detaching platform input listeners.
pub trait CaptureHost: Send {
    fn subscribe(&mut self, kind: EventKind);

    fn unsubscribe(&mut self, kind: EventKind);

    /// Whether the page is currently hidden from the user.
    fn is_hidden(&self) -> bool {
        false
    }
}

/// Capture host that only tracks which listeners are attached.
///
/// Clones share state, so a driver can inspect what the segmenter subscribed to.
#[derive(Debug, Clone, Default)]
pub struct ListenerSet {
    subscribed: Arc<Mutex<HashSet<EventKind>>>,
    hidden: Arc<AtomicBool>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.subscribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind)
    }

    pub fn subscribed_count(&self) -> usize {
        self.subscribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }
}

impl CaptureHost for ListenerSet {
    fn subscribe(&mut self, kind: EventKind) {
        self.subscribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind);
    }

    fn unsubscribe(&mut self, kind: EventKind) {
        self.subscribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }

    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }
}

/// Time since the previous observation.
#[derive(Debug, Clone, Default)]
pub struct DeltaTracker {
    last: Option<u64>,
}

impl DeltaTracker {
    pub fn observe(&mut self, t: u64) -> Option<u64> {
        let dt = self.last.map(|last| t.saturating_sub(last));
        self.last = Some(t);
        dt
    }

    pub const fn reset(&mut self) {
        self.last = None;
    }
}

/// Keeps the latest pointer position and samples it on the sampler tick.
#[derive(Debug, Clone, Default)]
pub struct PointerSampler {
    position: Option<(f64, f64)>,
    moved: bool,
    deltas: DeltaTracker,
}

impl PointerSampler {
    pub const fn on_move(&mut self, x: f64, y: f64) {
        self.position = Some((x, y));
        self.moved = true;
    }

    /// Samples the last position if the pointer moved since the previous sample.
    pub fn sample(&mut self, t: u64) -> Option<PointerSample> {
        if !self.moved {
            return None;
        }
        let (x, y) = self.position?;
        self.moved = false;
        Some(PointerSample {
            t,
            x,
            y,
            dt_since_last: self.deltas.observe(t),
        })
    }

    pub const fn reset(&mut self) {
        self.moved = false;
        self.deltas.reset();
    }
}

/// Throttled scroll position capture.
#[derive(Debug, Clone)]
pub struct ScrollCapturer {
    throttle_ms: u64,
    last: Option<(u64, f64, f64)>,
}

impl ScrollCapturer {
    pub const fn new(throttle_ms: u64) -> Self {
        Self {
            throttle_ms,
            last: None,
        }
    }

    /// Records a sample unless one was taken less than the throttle interval ago.
    pub fn on_scroll(&mut self, t: u64, x: f64, y: f64) -> Option<ScrollSample> {
        let (dx, dy, dt) = match self.last {
            Some((last_t, _, _)) if t.saturating_sub(last_t) < self.throttle_ms => return None,
            Some((last_t, last_x, last_y)) => (x - last_x, y - last_y, Some(t.saturating_sub(last_t))),
            None => (0.0, 0.0, None),
        };
        self.last = Some((t, x, y));
        Some(ScrollSample {
            t,
            x,
            y,
            dx,
            dy,
            dt_since_last: dt,
        })
    }

    pub const fn reset(&mut self) {
        self.last = None;
    }
}

/// Click normalization.
#[derive(Debug, Clone)]
pub struct ClickCapturer {
    text_limit: usize,
    deltas: DeltaTracker,
}

impl ClickCapturer {
    pub const fn new(text_limit: usize) -> Self {
        Self {
            text_limit,
            deltas: DeltaTracker { last: None },
        }
    }

    pub fn on_click(&mut self, t: u64, x: f64, y: f64, button: u8, target: &ElementInfo) -> ClickRecord {
        ClickRecord {
            t,
            x,
            y,
            button,
            target: TargetDescriptor::from_element(target, self.text_limit),
            dt_since_last: self.deltas.observe(t),
        }
    }

    pub const fn reset(&mut self) {
        self.deltas.reset();
    }
}

/// Key timing capture with per-field deltas and key name redaction.
#[derive(Debug, Clone, Default)]
pub struct KeyCapturer {
    fields: HashMap<Option<String>, DeltaTracker>,
}

impl KeyCapturer {
    /// Normalizes a key press. Modifier-only presses produce no record.
    pub fn on_key(
        &mut self,
        t: u64,
        raw_key: &str,
        repeat: bool,
        target: Option<&ElementInfo>,
    ) -> Option<KeyRecord> {
        let key = match keys::classify(raw_key) {
            KeyClass::Modifier => return None,
            KeyClass::Content => None,
            KeyClass::Allowed(key) => Some(key),
        };
        let field = target.and_then(ElementInfo::field_id);
        let dt_since_last = self.fields.entry(field.clone()).or_default().observe(t);
        Some(KeyRecord {
            t,
            field,
            key,
            repeat,
            dt_since_last,
        })
    }

    pub fn reset(&mut self) {
        self.fields.clear();
    }
}

/// All capturers of one page, reset together at segment boundaries.
#[derive(Debug, Clone)]
pub struct Capturers {
    pub pointer: PointerSampler,
    pub clicks: ClickCapturer,
    pub keys: KeyCapturer,
    pub scroll: ScrollCapturer,
}

impl Capturers {
    pub fn new(scroll_throttle_ms: u64, click_text_limit: usize) -> Self {
        Self {
            pointer: PointerSampler::default(),
            clicks: ClickCapturer::new(click_text_limit),
            keys: KeyCapturer::default(),
            scroll: ScrollCapturer::new(scroll_throttle_ms),
        }
    }

    /// Clears every delta tracker and throttle.
    pub fn reset(&mut self) {
        self.pointer.reset();
        self.clicks.reset();
        self.keys.reset();
        self.scroll.reset();
    }
}
