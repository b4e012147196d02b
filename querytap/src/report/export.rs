//! JSON export of report snapshots

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use super::snapshot::Snapshot;

/// JSON container written by `--export`
#[derive(Debug, Serialize)]
struct SnapshotExport<'a> {
    tool: &'static str,
    version: &'static str,
    snapshot: &'a Snapshot,
}

/// Write `snapshot` as pretty-printed JSON to any writer (file, stdout, buffer).
///
/// # Errors
/// Returns an error if serialization or the underlying write fails.
pub fn export_snapshot<W: Write>(snapshot: &Snapshot, mut writer: W) -> Result<()> {
    let export = SnapshotExport {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        snapshot,
    };

    serde_json::to_writer_pretty(&mut writer, &export).context("Failed to write snapshot JSON")?;
    writer.flush().context("Failed to flush snapshot JSON")?;

    Ok(())
}
