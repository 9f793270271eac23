//! `ix start`, `ix stop` and `ix clear`.

use std::io::Write;

use anyhow::{Context, Result};

use crate::App;

pub async fn start<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    let already = app.coordinator.status().await?.recording;
    let session = app
        .coordinator
        .begin()
        .await
        .context("failed to start recording")?;
    if already {
        writeln!(writer, "Already recording session {session}")?;
    } else {
        writeln!(writer, "Recording session {session}")?;
    }
    Ok(())
}

pub async fn stop<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    let status = app.coordinator.status().await?;
    app.coordinator
        .end()
        .await
        .context("failed to stop recording")?;
    match (status.recording, status.session_id) {
        (true, Some(session)) => writeln!(writer, "Stopped recording session {session}")?,
        _ => writeln!(writer, "Not recording")?,
    }
    Ok(())
}

pub async fn clear<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    app.coordinator
        .clear()
        .await
        .context("failed to clear sessions")?;
    writeln!(writer, "Cleared all sessions")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn app(temp: &tempfile::TempDir) -> App {
        App::open(Config {
            database_path: temp.path().join("ix.db"),
            ..Config::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn start_twice_reports_existing_session() {
        let temp = tempfile::tempdir().unwrap();
        let app = app(&temp);

        let mut first = Vec::new();
        start(&mut first, &app).await.unwrap();
        let mut second = Vec::new();
        start(&mut second, &app).await.unwrap();

        let first = String::from_utf8(first).unwrap();
        let second = String::from_utf8(second).unwrap();
        let session = first.trim().trim_start_matches("Recording session ");
        assert_eq!(second.trim(), format!("Already recording session {session}"));
        app.close().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_recording_says_so() {
        let temp = tempfile::tempdir().unwrap();
        let app = app(&temp);
        let mut output = Vec::new();
        stop(&mut output, &app).await.unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Not recording\n");
        app.close().await.unwrap();
    }
}
