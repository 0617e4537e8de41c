use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{BloomParams, Configuration};
use crate::events::ParamChange;

/// Re-reads the config at `path` and returns the edits relative to `last`,
/// updating `last` on success.
pub fn reload(path: &Path, last: &mut BloomParams) -> Result<Vec<ParamChange>> {
    let cfg = Configuration::from_yaml_file(path)
        .and_then(Configuration::validated)
        .with_context(|| format!("reloading {}", path.display()))?;
    let changes = ParamChange::diff(last, &cfg.params);
    *last = cfg.params;
    Ok(changes)
}

/// Watches the config file and forwards parameter edits until cancelled.
///
/// The parent directory is watched rather than the file itself so that
/// editors which save by rename are still picked up.
#[instrument(skip(initial, to_engine, cancel), fields(config = %path.display()))]
pub async fn run(
    path: PathBuf,
    initial: BloomParams,
    to_engine: Sender<ParamChange>,
    cancel: CancellationToken,
) -> Result<()> {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(64);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(watching = %dir.display(), "config watcher initialized");

    let file_name = path.file_name().map(|n| n.to_os_string());
    let mut last = initial;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting config watcher");
                break;
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !touches_config || !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        debug!(kind = ?event.kind, "fs: ignored");
                        continue;
                    }
                    // truncate-then-write saves surface an empty file first
                    if std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true) {
                        debug!("config empty or missing; waiting for next write");
                        continue;
                    }
                    match reload(&path, &mut last) {
                        Ok(changes) => {
                            debug!(count = changes.len(), "config reloaded");
                            for change in changes {
                                info!(?change, "config edit");
                                if to_engine.send(change).await.is_err() {
                                    debug!("engine channel closed; exiting config watcher");
                                    return Ok(());
                                }
                            }
                        }
                        Err(err) => warn!("keeping previous parameters: {err:#}"),
                    }
                }
                Err(err) => error!("watch error: {err}"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reload_reports_only_changed_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bloom.yaml");
        fs::write(&path, "params:\n  grid-size: 40\n  wave-speed: 0.9\n").unwrap();
        let mut last = BloomParams::default();
        let changes = reload(&path, &mut last).unwrap();
        assert_eq!(
            changes,
            vec![ParamChange::GridSize(40), ParamChange::WaveSpeed(0.9)]
        );
        assert_eq!(last.grid_size, 40);
        assert!(reload(&path, &mut last).unwrap().is_empty());
    }

    #[test]
    fn invalid_reload_keeps_last_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bloom.yaml");
        fs::write(&path, "params:\n  grid-size: 1\n").unwrap();
        let mut last = BloomParams::default();
        assert!(reload(&path, &mut last).is_err());
        assert_eq!(last, BloomParams::default());
    }
}
