// src/watch/source.rs
// The two interchangeable feeds of FileChanged events: directory-level
// notifications via notify, and mtime polling for platforms or sandboxes
// where those are unreliable. Both forward qualifying events into one
// channel consumed by the session loop.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Timings;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSourceKind {
    /// Directory-level change notifications, filtered to the scratch file.
    Notify,
    /// Periodic modification-time sampling.
    Poll,
}

/// Feed of qualifying change events for one scratch file. Dropping the
/// source tears down the watcher or polling task.
pub struct ChangeSource {
    rx: mpsc::Receiver<()>,
    kind: ChangeSourceKind,
    // Watching stops when the watcher is dropped.
    _watcher: Option<RecommendedWatcher>,
}

impl ChangeSource {
    /// Starts watching `path`. Probes the notify backend first and falls
    /// back to polling if the subscription cannot be established; that
    /// failure is logged and absorbed, never surfaced to the caller.
    pub fn spawn(path: &Path, timings: &Timings, force_poll: bool) -> Self {
        if force_poll {
            debug!("polling forced by configuration");
            return Self::spawn_poll(path.to_path_buf(), timings.poll_interval);
        }

        match Self::spawn_notify(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "change notifications unavailable, falling back to polling");
                Self::spawn_poll(path.to_path_buf(), timings.poll_interval)
            }
        }
    }

    pub fn kind(&self) -> ChangeSourceKind {
        self.kind
    }

    /// Next qualifying change. `None` once the feed has shut down.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    fn spawn_notify(path: &Path) -> notify::Result<Self> {
        // Editors that save via rename replace the inode, so the watch
        // must cover the parent directory, not the file itself.
        let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let base_name: OsString = path
            .file_name()
            .unwrap_or_else(|| path.as_os_str())
            .to_os_string();

        let (tx, rx) = mpsc::channel::<()>(EVENT_CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if is_qualifying(&event, &base_name) {
                        // Receiver gone means the session is over.
                        let _ = tx.blocking_send(());
                    }
                }
                Err(e) => {
                    warn!(error = %e, "watcher error");
                }
            },
            notify::Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        debug!(dir = %dir.display(), "watching scratch directory");
        Ok(Self {
            rx,
            kind: ChangeSourceKind::Notify,
            _watcher: Some(watcher),
        })
    }

    fn spawn_poll(path: PathBuf, interval: std::time::Duration) -> Self {
        let (tx, rx) = mpsc::channel::<()>(EVENT_CHANNEL_CAPACITY);

        debug!(path = %path.display(), "polling scratch file mtime");

        tokio::spawn(async move {
            let mut last = modified_time(&path);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                // The recorded value updates on every comparison, changed
                // or not, so one save yields exactly one event.
                let current = modified_time(&path);
                let changed = match (&last, &current) {
                    (Some(previous), Some(now)) => previous != now,
                    // The file may be briefly absent mid-rename; that is
                    // not a change by itself.
                    _ => false,
                };
                last = current.or(last);

                if changed && tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        Self {
            rx,
            kind: ChangeSourceKind::Poll,
            _watcher: None,
        }
    }
}

/// An event qualifies only if it names the scratch file itself (sibling
/// swap/backup files are noise) and reports a create or modify; a
/// rename-over save surfaces as a create of the watched name.
fn is_qualifying(event: &Event, base_name: &OsStr) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(base_name))
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
