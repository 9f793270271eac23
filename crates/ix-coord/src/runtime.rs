//! Drivers that run a [`Segmenter`] against a coordinator link.
//!
//! [`spawn_page`] runs one page on a tokio task with real timers.
//! [`VirtualPage`] runs one page on virtual time, stepped by the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ix_core::{
    CaptureConfig, Clock, HintsSource, ListenerSet, PagePorts, RawInput, Segmenter, SystemClock,
    TimerTable, VirtualClock,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::link::{Control, PageLink};

fn apply(segmenter: &mut Segmenter, command: Control) {
    match command {
        Control::Start(session_id) => segmenter.start(session_id),
        Control::Stop => segmenter.stop(),
        Control::Status(reply) => {
            if reply.send(segmenter.status()).is_err() {
                tracing::debug!(url = %segmenter.url(), "status requester went away");
            }
        }
    }
}

fn build(
    link: PageLink,
    config: CaptureConfig,
    hints: Box<dyn HintsSource>,
    clock: Arc<dyn Clock>,
) -> (Segmenter, TimerTable, ListenerSet, mpsc::UnboundedReceiver<Control>) {
    let timers = TimerTable::new(Arc::clone(&clock));
    let listeners = ListenerSet::new();
    let PageLink {
        url,
        control,
        transport,
        ..
    } = link;
    let ports = PagePorts {
        clock,
        scheduler: Box::new(timers.clone()),
        capture: Box::new(listeners.clone()),
        transport: Box::new(transport),
        hints,
    };
    let segmenter = Segmenter::new(url, config, ports);
    (segmenter, timers, listeners, control)
}

/// Handle to a page running on its own task.
pub struct PageTask {
    inputs: mpsc::UnboundedSender<RawInput>,
    join: JoinHandle<()>,
}

impl PageTask {
    /// Delivers raw input to the page. Returns false once the page has exited.
    pub fn input(&self, input: RawInput) -> bool {
        self.inputs.send(input).is_ok()
    }

    /// Closes the input side and waits for the page to stop.
    pub async fn close(self) {
        drop(self.inputs);
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "page task failed");
        }
    }
}

/// Runs a page on the current tokio runtime.
///
/// Inputs, control commands and timers are handled one at a time in a single
/// loop. The page stops recording and exits when its input side is closed or
/// the coordinator drops its control channel.
pub fn spawn_page(link: PageLink, config: CaptureConfig, hints: Box<dyn HintsSource>) -> PageTask {
    let (inputs, mut input_rx) = mpsc::unbounded_channel();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let (mut segmenter, timers, _listeners, mut control) =
        build(link, config, hints, Arc::clone(&clock));

    let join = tokio::spawn(async move {
        segmenter.announce();
        loop {
            let wait = timers
                .next_due()
                .map(|due| Duration::from_millis(due.saturating_sub(clock.now_ms())));
            tokio::select! {
                input = input_rx.recv() => match input {
                    Some(input) => segmenter.dispatch(input),
                    None => break,
                },
                command = control.recv() => match command {
                    Some(command) => apply(&mut segmenter, command),
                    None => break,
                },
                () = async {
                    match wait {
                        Some(wait) => tokio::time::sleep(wait).await,
                        None => std::future::pending().await,
                    }
                } => {
                    while let Some((_, timer)) = timers.pop_due(clock.now_ms()) {
                        segmenter.on_timer(timer);
                    }
                }
            }
        }
        segmenter.stop();
        tracing::debug!(url = %segmenter.url(), "page task exited");
    });

    PageTask { inputs, join }
}

/// A page on virtual time.
///
/// Nothing happens until the caller steps it: [`VirtualPage::pump_control`]
/// applies pending coordinator commands, [`VirtualPage::advance_to`] fires
/// due timers.
pub struct VirtualPage {
    segmenter: Segmenter,
    clock: VirtualClock,
    timers: TimerTable,
    listeners: ListenerSet,
    control: mpsc::UnboundedReceiver<Control>,
}

impl VirtualPage {
    pub fn new(
        link: PageLink,
        config: CaptureConfig,
        hints: Box<dyn HintsSource>,
        epoch: DateTime<Utc>,
    ) -> Self {
        let clock = VirtualClock::new(epoch);
        let (segmenter, timers, listeners, control) =
            build(link, config, hints, Arc::new(clock.clone()));
        segmenter.announce();
        Self {
            segmenter,
            clock,
            timers,
            listeners,
            control,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub const fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn segmenter_mut(&mut self) -> &mut Segmenter {
        &mut self.segmenter
    }

    pub const fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    /// Applies every control command already received.
    pub fn pump_control(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.control.try_recv() {
            apply(&mut self.segmenter, command);
            applied += 1;
        }
        applied
    }

    /// Moves time to `t`, firing due timers in order.
    pub fn advance_to(&mut self, t: u64) {
        let segmenter = &mut self.segmenter;
        self.timers
            .run_until(&self.clock, t, |timer| segmenter.on_timer(timer));
    }

    /// Moves time to `t`, then delivers `input`.
    pub fn input_at(&mut self, t: u64, input: RawInput) {
        self.advance_to(t);
        self.segmenter.dispatch(input);
    }
}
