//! Implementation of the `ix simulate` command.
//!
//! Replays a JSONL script of raw inputs through one page on virtual time.
//! The page is connected to the coordinator exactly like a live page, so
//! the replay exercises segmentation, flushing, counters and storage.
//!
//! Script lines look like:
//!
//! ```text
//! {"at_ms": 120, "type": "click", "x": 10, "y": 20, "target": {"tag": "button"}}
//! {"at_ms": 400, "type": "key", "key": "Enter", "target": {"tag": "input", "id": "q"}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Deserialize;

use ix_coord::VirtualPage;
use ix_core::{PageState, RawInput};

use crate::{App, HostHints};

#[derive(Debug, Deserialize)]
struct ScriptLine {
    at_ms: u64,
    #[serde(flatten)]
    input: RawInput,
}

fn parse_script(text: &str) -> Result<Vec<ScriptLine>> {
    let mut lines: Vec<ScriptLine> = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let line: ScriptLine = serde_json::from_str(raw)
            .with_context(|| format!("invalid script line {}", index + 1))?;
        if let Some(previous) = lines.last() {
            if line.at_ms < previous.at_ms {
                bail!(
                    "script line {} goes back in time ({} < {})",
                    index + 1,
                    line.at_ms,
                    previous.at_ms
                );
            }
        }
        lines.push(line);
    }
    Ok(lines)
}

pub async fn run<W: Write>(
    writer: &mut W,
    app: &mut App,
    script: &Path,
    url: &str,
    until: Option<u64>,
) -> Result<()> {
    let text = fs::read_to_string(script)
        .with_context(|| format!("failed to read {}", script.display()))?;
    let lines = parse_script(&text)?;

    let before = app.coordinator.status().await?;
    let link = app.coordinator.connect(url)?;
    let page_id = link.id.clone();
    let mut page = VirtualPage::new(
        link,
        app.config.capture.clone(),
        Box::new(HostHints),
        Utc::now(),
    );
    let session = app
        .coordinator
        .begin()
        .await
        .context("failed to start recording")?;
    app.coordinator.pump(&mut app.inbox).await?;
    page.pump_control();
    if page.segmenter().state() == PageState::Stopped {
        app.coordinator.disconnect(&page_id);
        if !before.recording {
            app.coordinator.end().await?;
        }
        bail!("{url} is not recordable");
    }

    let inputs = lines.len();
    let last = lines.last().map_or(0, |line| line.at_ms);
    for line in lines {
        page.input_at(line.at_ms, line.input);
    }
    page.advance_to(until.unwrap_or(last).max(last));
    let end_ms = page.now_ms();
    let final_segment = page.segmenter_mut().status().segment_id;
    page.segmenter_mut().stop();
    app.coordinator.disconnect(&page_id);

    if !before.recording {
        app.coordinator.end().await?;
    }
    app.coordinator.pump(&mut app.inbox).await?;
    let after = app.coordinator.status().await?;
    let (events, segments) = if before.session_id.as_ref() == Some(&session) {
        (
            after.counters.events().saturating_sub(before.counters.events()),
            after.segments.saturating_sub(before.segments),
        )
    } else {
        (after.counters.events(), after.segments)
    };

    writeln!(writer, "Simulated {inputs} input(s) over {end_ms} ms on {url}")?;
    writeln!(writer, "Session: {session}")?;
    if let Some(segment) = final_segment {
        writeln!(writer, "Last segment: {segment}")?;
    }
    writeln!(writer, "Recorded {events} event(s) in {segments} segment(s)")?;
    Ok(())
}
