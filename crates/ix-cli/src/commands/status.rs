//! Status command for showing recording state and counters.

use std::io::Write;

use anyhow::{Context, Result};

use ix_coord::StatusReport;

use crate::App;

pub async fn run<W: Write>(writer: &mut W, app: &App, json: bool) -> Result<()> {
    let report = app
        .coordinator
        .status()
        .await
        .context("failed to read recording state")?;

    if json {
        serde_json::to_writer_pretty(&mut *writer, &report).context("failed to encode status")?;
        writeln!(writer)?;
        return Ok(());
    }

    write_text(writer, &report, app)
}

fn write_text<W: Write>(writer: &mut W, report: &StatusReport, app: &App) -> Result<()> {
    let counters = &report.counters;
    writeln!(writer, "ix status")?;
    writeln!(writer, "Database: {}", app.config.database_path.display())?;
    writeln!(
        writer,
        "Recording: {}",
        if report.recording { "on" } else { "off" }
    )?;
    match &report.session_id {
        Some(session) => writeln!(writer, "Session: {session}")?,
        None => writeln!(writer, "Session: none")?,
    }
    writeln!(
        writer,
        "Events: {} (pointer {}, clicks {}, keys {}, scrolls {})",
        counters.events(),
        counters.pointer,
        counters.clicks,
        counters.keys,
        counters.scrolls
    )?;
    writeln!(writer, "Segments: {}", report.segments)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::Config;

    fn open(temp: &tempfile::TempDir) -> App {
        App::open(Config {
            database_path: temp.path().join("ix.db"),
            ..Config::default()
        })
        .unwrap()
    }

    fn redact(output: Vec<u8>, temp: &tempfile::TempDir) -> String {
        String::from_utf8(output)
            .unwrap()
            .replace(&temp.path().display().to_string(), "[TEMP]")
    }

    #[tokio::test]
    async fn status_command_outputs_fresh_state() {
        let temp = tempfile::tempdir().unwrap();
        let app = open(&temp);

        let mut output = Vec::new();
        run(&mut output, &app, false).await.unwrap();

        assert_snapshot!(redact(output, &temp), @r"
        ix status
        Database: [TEMP]/ix.db
        Recording: off
        Session: none
        Events: 0 (pointer 0, clicks 0, keys 0, scrolls 0)
        Segments: 0
        ");
        app.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_json_reports_session() {
        let temp = tempfile::tempdir().unwrap();
        let app = open(&temp);
        let session = app.coordinator.begin().await.unwrap();

        let mut output = Vec::new();
        run(&mut output, &app, true).await.unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["recording"], true);
        assert_eq!(value["session_id"], session.as_str());
        assert_eq!(value["counters"]["clicks"], 0);
        assert_eq!(value["segments"], 0);
        app.close().await.unwrap();
    }
}
