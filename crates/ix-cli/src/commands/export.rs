//! Implementation of the `ix export` command.
//!
//! Consolidates every stored session and writes one pretty-printed JSON
//! document into the export directory.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use ix_coord::DirectorySink;

use crate::App;

pub async fn run<W: Write>(writer: &mut W, app: &App, out: Option<&Path>) -> Result<()> {
    let dir = out.unwrap_or(&app.config.export_dir);
    let sink = DirectorySink::new(dir);
    let receipt = app
        .coordinator
        .export(&sink)
        .await
        .context("export failed")?;

    writeln!(
        writer,
        "Exported {} session(s), {} segment(s), {} bytes",
        receipt.sessions, receipt.segments, receipt.bytes
    )?;
    writeln!(writer, "File: {}", receipt.path.display())?;
    Ok(())
}
