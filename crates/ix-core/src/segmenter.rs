//! Per-page capture and segmentation state machine.
//!
//! A [`Segmenter`] owns one page's buffers and decides when a segment starts
//! and ends:
//!
//! ```text
//!            start                 idle threshold / hidden
//! Stopped ──────────▶ Active ─────────────────────────────▶ Idle
//!    ▲                  ▲                                    │
//!    │ stop             └────────── interaction ─────────────┘
//!    └──────────────────────── (Active | Idle)
//! ```
//!
//! Every transition out of `Active` flushes the buffers as a terminal
//! fragment. All entry points run on the page's single logical thread, so the
//! buffers need no locking.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureHost, Capturers};
use crate::clock::{Clock, Scheduler, Timer, TimerId};
use crate::event::RawInput;
use crate::event_kind::EventKind;
use crate::fragment::{BufferLengths, Buffers, Fragment, PageMessage, PageMeta, Transport, host_of};
use crate::hints::HintsSource;
use crate::types::{SegmentId, SessionId};

/// Timing and size parameters of page capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Inactivity that ends the current segment.
    pub idle_threshold_ms: u64,
    /// Pointer position sampling period.
    pub sample_interval_ms: u64,
    /// Minimum spacing between scroll samples.
    pub scroll_throttle_ms: u64,
    /// Periodic flush period.
    pub flush_interval_ms: u64,
    /// How often idleness is checked while active.
    pub idle_check_interval_ms: u64,
    /// Maximum characters of click target text kept.
    pub click_text_limit: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            idle_threshold_ms: 3000,
            sample_interval_ms: 15,
            scroll_throttle_ms: 50,
            flush_interval_ms: 5000,
            idle_check_interval_ms: 250,
            click_text_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Stopped,
    Active,
    Idle,
}

/// Reply to a status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStatus {
    pub recording: bool,
    pub is_idle: bool,
    pub segment_id: Option<SegmentId>,
    pub buffers: BufferLengths,
}

/// Host capabilities a segmenter runs against.
pub struct PagePorts {
    pub clock: Arc<dyn Clock>,
    pub scheduler: Box<dyn Scheduler>,
    pub capture: Box<dyn CaptureHost>,
    pub transport: Box<dyn Transport>,
    pub hints: Box<dyn HintsSource>,
}

#[derive(Debug, Default)]
struct Timers {
    sample: Option<TimerId>,
    flush: Option<TimerId>,
    idle_check: Option<TimerId>,
}

pub struct Segmenter {
    config: CaptureConfig,
    url: String,
    host: String,
    ports: PagePorts,
    state: PageState,
    session_id: Option<SessionId>,
    segment_id: SegmentId,
    buffers: Buffers,
    /// Whether any flush of the current segment carried records.
    segment_had_records: bool,
    capturers: Capturers,
    last_activity: u64,
    hidden: bool,
    listening: HashSet<EventKind>,
    timers: Timers,
}

impl Segmenter {
    pub fn new(url: impl Into<String>, config: CaptureConfig, ports: PagePorts) -> Self {
        let url = url.into();
        let host = host_of(&url);
        let capturers = Capturers::new(config.scroll_throttle_ms, config.click_text_limit);
        Self {
            config,
            url,
            host,
            ports,
            state: PageState::Stopped,
            session_id: None,
            segment_id: SegmentId::FIRST,
            buffers: Buffers::default(),
            segment_had_records: false,
            capturers,
            last_activity: 0,
            hidden: false,
            listening: HashSet::new(),
            timers: Timers::default(),
        }
    }

    pub const fn state(&self) -> PageState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub const fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Tells the coordinator this page context is (re)initialized.
    pub fn announce(&self) {
        if let Err(e) = self.ports.transport.send(PageMessage::Ready) {
            tracing::debug!(url = %self.url, error = %e, "ready announcement not delivered");
        }
    }

    /// Answers a status request, first settling any idle transition that is due.
    pub fn status(&mut self) -> PageStatus {
        let now = self.ports.clock.now_ms();
        self.poll_idle(now);
        let recording = self.state != PageState::Stopped;
        PageStatus {
            recording,
            is_idle: self.state == PageState::Idle,
            segment_id: recording.then_some(self.segment_id),
            buffers: self.buffers.lengths(),
        }
    }

    /// Starts recording into `session_id`.
    ///
    /// Starting again with the same session is a no-op. Starting with a
    /// different session ends the current one first.
    pub fn start(&mut self, session_id: SessionId) {
        if self.state != PageState::Stopped {
            if self.session_id.as_ref() == Some(&session_id) {
                tracing::debug!(url = %self.url, session = %session_id, "already recording");
                return;
            }
            self.stop();
        }

        let now = self.ports.clock.now_ms();
        self.session_id = Some(session_id.clone());
        self.segment_id = SegmentId::FIRST;
        self.buffers = Buffers::default();
        self.segment_had_records = false;
        self.capturers.reset();
        self.last_activity = now;
        self.hidden = self.ports.capture.is_hidden();

        for kind in EventKind::ALL {
            self.ports.capture.subscribe(kind);
            self.listening.insert(kind);
        }
        self.timers.flush = Some(
            self.ports
                .scheduler
                .schedule_repeating(Timer::Flush, self.config.flush_interval_ms),
        );
        self.timers.idle_check = Some(
            self.ports
                .scheduler
                .schedule_repeating(Timer::IdleCheck, self.config.idle_check_interval_ms),
        );

        if self.hidden {
            self.state = PageState::Idle;
        } else {
            self.state = PageState::Active;
            self.resume_sampling();
        }
        tracing::info!(url = %self.url, session = %session_id, state = ?self.state, "recording started");

        let meta = PageMeta {
            session_id,
            url: self.url.clone(),
            host: self.host.clone(),
            client_hints: self.ports.hints.client_hints(),
            network_info: self.ports.hints.network_info(),
            timestamp: self.ports.clock.wall(),
        };
        self.deliver(PageMessage::PageMeta(meta));
    }

    /// Stops recording.
    ///
    /// Listeners and timers are gone before the terminal flush is sent, so
    /// nothing can be captured after this call begins.
    pub fn stop(&mut self) {
        if self.state == PageState::Stopped {
            return;
        }
        self.detach();
        self.flush(true);
        self.state = PageState::Stopped;
        self.session_id = None;
        tracing::info!(url = %self.url, segment = %self.segment_id, "recording stopped");
    }

    /// Delivers one raw input to the listener registered for its kind.
    pub fn dispatch(&mut self, input: RawInput) {
        let Some(kind) = input.kind() else {
            if let RawInput::Visibility { hidden } = input {
                self.on_visibility(hidden);
            }
            return;
        };
        if !self.listening.contains(&kind) {
            return;
        }

        let now = self.ports.clock.now_ms();
        self.poll_idle(now);
        self.last_activity = now;
        if self.hidden {
            return;
        }
        if self.state == PageState::Idle {
            self.wake();
        }

        match input {
            RawInput::PointerMove { x, y } => self.capturers.pointer.on_move(x, y),
            RawInput::Click {
                x,
                y,
                button,
                target,
            } => {
                let record = self.capturers.clicks.on_click(now, x, y, button, &target);
                self.buffers.clicks.push(record);
            }
            RawInput::Key {
                key,
                repeat,
                target,
            } => {
                if let Some(record) = self.capturers.keys.on_key(now, &key, repeat, target.as_ref()) {
                    self.buffers.keys.push(record);
                }
            }
            RawInput::Scroll { x, y } => {
                if let Some(sample) = self.capturers.scroll.on_scroll(now, x, y) {
                    self.buffers.scrolls.push(sample);
                }
            }
            RawInput::Visibility { .. } => {}
        }
    }

    /// Runs one timer callback.
    pub fn on_timer(&mut self, timer: Timer) {
        let now = self.ports.clock.now_ms();
        match timer {
            Timer::Sample => {
                if self.state == PageState::Active && !self.hidden {
                    if let Some(sample) = self.capturers.pointer.sample(now) {
                        self.buffers.pointer.push(sample);
                    }
                }
            }
            Timer::Flush => self.flush(false),
            Timer::IdleCheck => self.poll_idle(now),
        }
    }

    fn on_visibility(&mut self, hidden: bool) {
        if self.state == PageState::Stopped {
            return;
        }
        self.hidden = hidden;
        if hidden && self.state == PageState::Active {
            tracing::debug!(url = %self.url, segment = %self.segment_id, "page hidden");
            self.enter_idle();
        }
    }

    fn poll_idle(&mut self, now: u64) {
        if self.state == PageState::Active
            && now.saturating_sub(self.last_activity) >= self.config.idle_threshold_ms
        {
            tracing::debug!(url = %self.url, segment = %self.segment_id, "idle threshold reached");
            self.enter_idle();
        }
    }

    fn enter_idle(&mut self) {
        self.state = PageState::Idle;
        if let Some(id) = self.timers.sample.take() {
            self.ports.scheduler.cancel(id);
        }
        self.flush(true);
    }

    fn wake(&mut self) {
        self.segment_id = self.segment_id.next();
        self.buffers = Buffers::default();
        self.segment_had_records = false;
        self.capturers.reset();
        self.state = PageState::Active;
        self.resume_sampling();
        tracing::debug!(url = %self.url, segment = %self.segment_id, "segment started");
    }

    fn resume_sampling(&mut self) {
        if self.timers.sample.is_none() {
            self.timers.sample = Some(
                self.ports
                    .scheduler
                    .schedule_repeating(Timer::Sample, self.config.sample_interval_ms),
            );
        }
    }

    /// Drains the buffers into a fragment and sends it.
    ///
    /// A non-terminal flush with nothing buffered sends nothing.
    fn flush(&mut self, terminal: bool) {
        let Some(session_id) = self.session_id.clone() else {
            return;
        };
        if !terminal && self.buffers.is_empty() {
            return;
        }
        let buffers = self.buffers.drain();
        let had_records = self.segment_had_records || !buffers.is_empty();
        self.segment_had_records = had_records && !terminal;
        let fragment = Fragment {
            session_id,
            segment_id: self.segment_id,
            page_url: self.url.clone(),
            host: self.host.clone(),
            timestamp: self.ports.clock.wall(),
            terminal,
            had_records,
            buffers,
        };
        tracing::debug!(
            url = %self.url,
            segment = %fragment.segment_id,
            terminal,
            "flushing fragment"
        );
        self.deliver(PageMessage::Fragment(fragment));
    }

    fn deliver(&mut self, message: PageMessage) {
        if let Err(e) = self.ports.transport.send(message) {
            tracing::warn!(url = %self.url, error = %e, "delivery failed, recording halted");
            self.halt();
        }
    }

    /// Stops without flushing, for when the coordinator is unreachable.
    fn halt(&mut self) {
        self.detach();
        self.buffers = Buffers::default();
        self.segment_had_records = false;
        self.state = PageState::Stopped;
        self.session_id = None;
    }

    fn detach(&mut self) {
        for kind in self.listening.drain() {
            self.ports.capture.unsubscribe(kind);
        }
        for id in [
            self.timers.sample.take(),
            self.timers.flush.take(),
            self.timers.idle_check.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.ports.scheduler.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    use crate::capture::ListenerSet;
    use crate::clock::{TimerTable, VirtualClock};
    use crate::event::ElementInfo;
    use crate::fragment::MemoryTransport;
    use crate::hints::StaticHints;
    use crate::keys::AllowedKey;

    struct Page {
        clock: VirtualClock,
        timers: TimerTable,
        listeners: ListenerSet,
        transport: MemoryTransport,
        segmenter: Segmenter,
    }

    impl Page {
        fn new() -> Self {
            Self::with_config(CaptureConfig::default())
        }

        fn with_config(config: CaptureConfig) -> Self {
            let clock = VirtualClock::new(DateTime::<Utc>::UNIX_EPOCH);
            let timers = TimerTable::new(Arc::new(clock.clone()));
            let listeners = ListenerSet::new();
            let transport = MemoryTransport::new();
            let ports = PagePorts {
                clock: Arc::new(clock.clone()),
                scheduler: Box::new(timers.clone()),
                capture: Box::new(listeners.clone()),
                transport: Box::new(transport.clone()),
                hints: Box::new(StaticHints::default()),
            };
            let segmenter = Segmenter::new("https://shop.test/cart", config, ports);
            Self {
                clock,
                timers,
                listeners,
                transport,
                segmenter,
            }
        }

        fn start(&mut self) {
            self.segmenter.start(SessionId::new("session-1").unwrap());
        }

        /// Advances virtual time to `t`, firing due timers, then delivers `input`.
        fn input_at(&mut self, t: u64, input: RawInput) {
            self.advance_to(t);
            self.segmenter.dispatch(input);
        }

        fn advance_to(&mut self, t: u64) {
            let segmenter = &mut self.segmenter;
            self.timers
                .run_until(&self.clock, t, |timer| segmenter.on_timer(timer));
        }

        fn terminal_count(&self) -> usize {
            self.transport.fragments().iter().filter(|f| f.terminal).count()
        }
    }

    fn click() -> RawInput {
        RawInput::Click {
            x: 5.0,
            y: 5.0,
            button: 0,
            target: ElementInfo {
                tag: "button".into(),
                ..ElementInfo::default()
            },
        }
    }

    fn key(name: &str) -> RawInput {
        RawInput::Key {
            key: name.into(),
            repeat: false,
            target: Some(ElementInfo {
                tag: "input".into(),
                id: Some("search".into()),
                ..ElementInfo::default()
            }),
        }
    }

    #[test]
    fn start_subscribes_listeners_and_sends_page_meta() {
        let mut page = Page::new();
        page.start();

        assert_eq!(page.segmenter.state(), PageState::Active);
        assert_eq!(page.listeners.subscribed_count(), 4);
        assert_eq!(page.timers.len(), 3);
        let messages = page.transport.messages();
        assert_eq!(messages.len(), 1);
        let PageMessage::PageMeta(meta) = &messages[0] else {
            panic!("expected page meta, got {messages:?}");
        };
        assert_eq!(meta.host, "shop.test");
        assert_eq!(meta.session_id.as_str(), "session-1");
    }

    #[test]
    fn starting_same_session_twice_is_a_no_op() {
        let mut page = Page::new();
        page.start();
        page.start();
        assert_eq!(page.transport.messages().len(), 1);
    }

    #[test]
    fn click_deltas_are_null_then_elapsed_time() {
        let mut page = Page::new();
        page.start();
        page.input_at(100, click());
        page.input_at(350, click());
        page.segmenter.stop();

        let clicks: Vec<_> = page
            .transport
            .fragments()
            .into_iter()
            .flat_map(|f| f.buffers.clicks)
            .collect();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[0].dt_since_last, None);
        assert_eq!(clicks[1].dt_since_last, Some(250));
    }

    #[test]
    fn idle_after_threshold_flushes_once_and_keeps_segment_id() {
        let mut page = Page::new();
        page.start();
        page.input_at(0, click());

        page.advance_to(3001);
        let status = page.segmenter.status();

        assert!(status.is_idle);
        assert!(status.recording);
        assert_eq!(status.segment_id, Some(SegmentId::FIRST));
        assert_eq!(page.terminal_count(), 1);
        let fragments = page.transport.fragments();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].buffers.clicks.len(), 1);
    }

    #[test]
    fn status_settles_a_due_idle_transition() {
        let config = CaptureConfig {
            idle_check_interval_ms: 10_000,
            ..CaptureConfig::default()
        };
        let mut page = Page::with_config(config);
        page.start();
        page.input_at(0, click());
        page.clock.set(3001);

        assert!(page.segmenter.status().is_idle);
        assert_eq!(page.terminal_count(), 1);
    }

    #[test]
    fn interaction_after_idle_starts_next_segment() {
        let mut page = Page::new();
        page.start();
        page.input_at(10, click());
        page.input_at(5000, click());

        let status = page.segmenter.status();
        assert!(!status.is_idle);
        assert_eq!(status.segment_id, Some(SegmentId::FIRST.next()));
        assert_eq!(status.buffers.clicks, 1);

        page.segmenter.stop();
        let fragments = page.transport.fragments();
        let second_segment: Vec<_> = fragments
            .iter()
            .filter(|f| f.segment_id == SegmentId::FIRST.next())
            .collect();
        assert_eq!(second_segment.len(), 1);
        assert_eq!(
            second_segment[0].buffers.clicks[0].dt_since_last, None,
            "delta trackers reset at segment start"
        );
    }

    #[test]
    fn bursts_separated_by_idle_gaps_get_increasing_non_overlapping_segments() {
        let mut page = Page::new();
        page.start();
        let mut t = 0;
        for _ in 0..4 {
            page.input_at(t, click());
            page.input_at(t + 100, click());
            t += 100 + 3000 + 500;
        }
        page.segmenter.stop();

        let fragments = page.transport.fragments();
        let mut previous: Option<(SegmentId, u64)> = None;
        for fragment in fragments.iter().filter(|f| !f.buffers.is_empty()) {
            let first = fragment.buffers.clicks.first().unwrap().t;
            let last = fragment.buffers.clicks.last().unwrap().t;
            if let Some((id, end)) = previous {
                assert!(fragment.segment_id > id);
                assert!(first > end);
            }
            previous = Some((fragment.segment_id, last));
        }
        assert_eq!(previous.unwrap().0.value(), 4);
    }

    #[test]
    fn exact_threshold_gap_ends_segment() {
        let mut page = Page::new();
        page.start();
        page.input_at(0, click());
        page.input_at(3000, click());
        assert_eq!(page.segmenter.status().segment_id, Some(SegmentId::FIRST.next()));
    }

    #[test]
    fn periodic_flush_sends_non_terminal_fragment_and_skips_empty() {
        let mut page = Page::new();
        page.start();
        page.input_at(100, click());
        page.input_at(2600, click());
        page.input_at(4900, click());
        page.advance_to(5000);

        let fragments = page.transport.fragments();
        assert_eq!(fragments.len(), 1);
        assert!(!fragments[0].terminal);
        assert_eq!(fragments[0].buffers.clicks.len(), 3);
        assert_eq!(page.segmenter.status().buffers.clicks, 0);
    }

    #[test]
    fn empty_terminal_after_periodic_flush_remembers_records() {
        let mut page = Page::new();
        page.start();
        page.input_at(100, click());
        page.input_at(2500, click());
        page.input_at(4500, click());
        page.advance_to(7500);

        let fragments = page.transport.fragments();
        assert_eq!(fragments.len(), 2);
        assert!(!fragments[0].terminal);
        assert_eq!(fragments[0].buffers.clicks.len(), 3);
        assert!(fragments[1].terminal);
        assert!(fragments[1].buffers.is_empty());
        assert!(fragments[1].had_records);
    }

    #[test]
    fn segment_without_records_closes_without_records() {
        let mut page = Page::new();
        page.start();
        page.advance_to(3000);
        page.input_at(3500, click());
        page.segmenter.stop();

        let flags: Vec<_> = page
            .transport
            .fragments()
            .iter()
            .map(|f| (f.segment_id.value(), f.terminal, f.had_records))
            .collect();
        assert_eq!(flags, vec![(1, true, false), (2, true, true)]);
    }

    #[test]
    fn drain_is_atomic_across_flushes() {
        let mut page = Page::new();
        page.start();
        for t in (0..12_000).step_by(400) {
            page.input_at(t, click());
        }
        let remaining = page.segmenter.status().buffers.clicks;
        let flushed: usize = page
            .transport
            .fragments()
            .iter()
            .map(|f| f.buffers.clicks.len())
            .sum();
        assert_eq!(flushed + remaining, 30);

        let mut times: Vec<u64> = page
            .transport
            .fragments()
            .into_iter()
            .flat_map(|f| f.buffers.clicks)
            .map(|c| c.t)
            .collect();
        let before = times.len();
        times.dedup();
        assert_eq!(times.len(), before, "no record appears in two flushes");
    }

    #[test]
    fn pointer_is_sampled_at_fixed_rate_not_event_rate() {
        let mut page = Page::new();
        page.start();
        for t in 0..60 {
            page.input_at(t, RawInput::PointerMove {
                x: t as f64,
                y: 0.0,
            });
        }
        page.advance_to(61);

        let samples = page.segmenter.status().buffers.pointer;
        assert_eq!(samples, 4, "60 moves over 60ms sample at 15, 30, 45, 60");
    }

    #[test]
    fn sampling_is_suspended_while_idle() {
        let mut page = Page::new();
        page.start();
        page.input_at(0, RawInput::PointerMove { x: 1.0, y: 1.0 });
        page.advance_to(3500);
        assert_eq!(page.timers.len(), 2, "sampler cancelled, flush and idle check remain");

        page.input_at(3600, RawInput::PointerMove { x: 2.0, y: 2.0 });
        assert_eq!(page.timers.len(), 3);
    }

    #[test]
    fn hidden_page_goes_idle_and_ignores_input() {
        let mut page = Page::new();
        page.start();
        page.input_at(10, click());
        page.input_at(20, RawInput::Visibility { hidden: true });

        assert!(page.segmenter.status().is_idle);
        assert_eq!(page.terminal_count(), 1);

        page.input_at(30, click());
        let status = page.segmenter.status();
        assert!(status.is_idle);
        assert_eq!(status.buffers.clicks, 0);

        page.input_at(40, RawInput::Visibility { hidden: false });
        page.input_at(50, click());
        let status = page.segmenter.status();
        assert!(!status.is_idle);
        assert_eq!(status.segment_id, Some(SegmentId::FIRST.next()));
        assert_eq!(status.buffers.clicks, 1);
    }

    #[test]
    fn only_allow_listed_key_names_are_captured() {
        let mut page = Page::new();
        page.start();
        for (t, name) in ["h", "Shift", "Backspace", "1", "Enter", "Meta"].iter().enumerate() {
            page.input_at(t as u64 * 10, key(name));
        }
        page.segmenter.stop();

        let keys: Vec<_> = page
            .transport
            .fragments()
            .into_iter()
            .flat_map(|f| f.buffers.keys)
            .collect();
        let names: Vec<_> = keys.iter().map(|k| k.key).collect();
        assert_eq!(
            names,
            vec![None, Some(AllowedKey::Backspace), None, Some(AllowedKey::Enter)]
        );
        assert!(keys.iter().all(|k| k.field.as_deref() == Some("search")));
    }

    #[test]
    fn stop_during_idle_flush_detaches_everything() {
        let mut page = Page::new();
        page.start();
        page.input_at(0, click());
        page.advance_to(3000);
        assert_eq!(page.terminal_count(), 1);

        page.segmenter.stop();
        assert_eq!(page.listeners.subscribed_count(), 0);
        assert!(page.timers.is_empty());
        assert!(!page.segmenter.status().recording);

        let sent = page.transport.messages().len();
        page.input_at(3100, click());
        page.advance_to(20_000);
        assert_eq!(page.transport.messages().len(), sent);
        assert_eq!(page.segmenter.status().buffers, BufferLengths::default());
    }

    #[test]
    fn stop_sends_terminal_fragment_even_when_empty() {
        let mut page = Page::new();
        page.start();
        page.segmenter.stop();

        let fragments = page.transport.fragments();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].terminal);
        assert!(fragments[0].buffers.is_empty());
        assert!(!fragments[0].had_records);
        assert_eq!(page.segmenter.state(), PageState::Stopped);
    }

    #[test]
    fn delivery_failure_halts_recording() {
        let mut page = Page::new();
        page.start();
        page.input_at(10, click());
        page.transport.close();
        page.advance_to(5000);

        assert_eq!(page.segmenter.state(), PageState::Stopped);
        assert_eq!(page.listeners.subscribed_count(), 0);
        assert!(page.timers.is_empty());
    }

    #[test]
    fn restart_with_new_session_resets_segment_ids() {
        let mut page = Page::new();
        page.start();
        page.input_at(0, click());
        page.input_at(4000, click());
        assert_eq!(page.segmenter.status().segment_id.unwrap().value(), 2);

        page.segmenter.start(SessionId::new("session-2").unwrap());
        let status = page.segmenter.status();
        assert_eq!(status.segment_id, Some(SegmentId::FIRST));
        assert_eq!(page.segmenter.session_id().unwrap().as_str(), "session-2");
    }

    #[test]
    fn starting_while_hidden_begins_idle() {
        let mut page = Page::new();
        page.listeners.set_hidden(true);
        page.start();
        assert_eq!(page.segmenter.state(), PageState::Idle);
        assert_eq!(page.timers.len(), 2);
    }
}
