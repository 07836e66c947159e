// src/cleanup.rs

use std::time::Duration;

use crate::config::Config;

/// Spawns the periodic export-file cleanup task: generated documents are
/// one-shot downloads, so anything older than the retention window is
/// deleted. Failures are logged and never fatal.
pub fn spawn_export_cleanup(config: Config) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(
            config.export_retention_secs.max(60),
        ));
        loop {
            interval.tick().await;
            if let Err(e) = sweep_old_exports(&config.export_dir, config.export_retention_secs) {
                tracing::warn!("Export cleanup sweep failed: {}", e);
            }
        }
    });
}

fn sweep_old_exports(export_dir: &str, retention_secs: u64) -> std::io::Result<()> {
    let entries = match std::fs::read_dir(export_dir) {
        Ok(entries) => entries,
        // Nothing exported yet.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let mut removed = 0usize;
    for entry in entries {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let age = metadata
            .modified()?
            .elapsed()
            .unwrap_or(Duration::ZERO);
        if age.as_secs() > retention_secs {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    if removed > 0 {
        tracing::info!("Export cleanup removed {} stale file(s)", removed);
    }
    Ok(())
}
