//! Directory watching for change-triggered reloads.

use std::path::Path;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tokio::sync::{Mutex, mpsc};
use tokio::time::sleep;
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Watches the monitored directory and turns raw filesystem events into
/// coalesced reload triggers.
///
/// Raw events pass through a quiet-period stage: a burst of events becomes a
/// single trigger once the directory has been quiet for the debounce
/// duration. Triggers land on a single-slot channel, so at most one reload is
/// pending while another is in flight and bursts collapse into one rescan.
pub struct DirWatcher {
    watcher: Mutex<Option<RecommendedWatcher>>,
    debounce: Duration,
}

impl DirWatcher {
    /// Create a watcher and the trigger receiver it feeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying watch resource cannot be created.
    pub fn new(debounce: Duration) -> Result<(Self, mpsc::Receiver<()>)> {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                // Additions, modifications, removals and renames all count as
                // a generic change. Access events are filtered out: the
                // reload pipeline itself reads every candidate file.
                Ok(event) if !matches!(event.kind, EventKind::Access(_)) => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                // Errors from an already-closing watch handle are swallowed.
                Err(_) => {}
            }
        })
        .map_err(|e| ConfigError::Watch(format!("failed to create file watcher: {e}")))?;

        tokio::spawn(async move {
            while event_rx.recv().await.is_some() {
                // Absorb the rest of the burst until the directory is quiet.
                loop {
                    tokio::select! {
                        _ = sleep(debounce) => break,
                        event = event_rx.recv() => {
                            if event.is_none() {
                                break;
                            }
                        }
                    }
                }
                match trigger_tx.try_send(()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(())) => {
                        // The pending reload will rescan and observe the same
                        // directory state this trigger was announcing.
                        debug!("reload already pending, coalescing change event");
                    }
                    Err(mpsc::error::TrySendError::Closed(())) => return,
                }
            }
        });

        Ok((
            Self {
                watcher: Mutex::new(Some(watcher)),
                debounce,
            },
            trigger_rx,
        ))
    }

    /// Start watching a directory, non-recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be watched (e.g. it does not
    /// exist yet) or the watcher has been detached.
    pub async fn watch(&self, dir: &Path) -> Result<()> {
        let mut guard = self.watcher.lock().await;
        let watcher = guard
            .as_mut()
            .ok_or_else(|| ConfigError::Watch("watcher is detached".to_string()))?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Watch(format!("failed to watch {}: {e}", dir.display())))
    }

    /// Detach the watch resource. No further events are delivered and the
    /// trigger channel closes once in-flight events drain. Idempotent.
    pub async fn detach(&self) {
        self.watcher.lock().await.take();
    }

    /// The quiet period applied to event bursts.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn watcher_creation() {
        let result = DirWatcher::new(Duration::from_millis(100));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn change_in_watched_directory_triggers() {
        let dir = TempDir::new().unwrap();
        let (watcher, mut triggers) = DirWatcher::new(Duration::from_millis(50)).unwrap();
        watcher.watch(dir.path()).await.unwrap();

        let path = dir.path().join("config.xml");
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            fs::write(&path, "<RDConfig/>").unwrap();
        });

        let result = timeout(Duration::from_secs(5), triggers.recv()).await;
        assert!(result.is_ok());
        assert!(result.unwrap().is_some());
    }

    #[tokio::test]
    async fn watch_of_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let (watcher, _triggers) = DirWatcher::new(Duration::from_millis(50)).unwrap();
        let result = watcher.watch(&dir.path().join("missing")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn detach_closes_the_trigger_channel() {
        let dir = TempDir::new().unwrap();
        let (watcher, mut triggers) = DirWatcher::new(Duration::from_millis(50)).unwrap();
        watcher.watch(dir.path()).await.unwrap();

        watcher.detach().await;
        // Detaching again is fine.
        watcher.detach().await;

        fs::write(dir.path().join("late.xml"), "<RDConfig/>").unwrap();

        let result = timeout(Duration::from_secs(2), triggers.recv()).await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn debounce_is_recorded() {
        let debounce = Duration::from_millis(250);
        let (watcher, _triggers) = DirWatcher::new(debounce).unwrap();
        assert_eq!(watcher.debounce(), debounce);
    }
}
