//! Configuration file watcher for hot reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::error::ConfigResult;
use crate::config::loader::FileConfigStore;

/// Re-reads a [`FileConfigStore`] whenever its file changes.
///
/// The store is swapped in place; the receiver gets one message per
/// successful reload so callers can warm up clients.
pub struct ConfigWatcher {
    store: Arc<FileConfigStore>,
    update_tx: mpsc::UnboundedSender<PathBuf>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for reload notifications.
    pub fn new(store: Arc<FileConfigStore>) -> (Self, mpsc::UnboundedReceiver<PathBuf>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (Self { store, update_tx }, update_rx)
    }

    /// Start watching the file in a background thread.
    ///
    /// Watching stops when the returned watcher is dropped.
    pub fn run(self) -> ConfigResult<RecommendedWatcher> {
        let tx = self.update_tx.clone();
        let store = self.store.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?store.path(), "Config file change detected, reloading...");
                        match store.reload() {
                            Ok(()) => {
                                let _ = tx.send(store.path().to_path_buf());
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(self.store.path(), RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.store.path(), "Config watcher started");
        Ok(watcher)
    }
}
