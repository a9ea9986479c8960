//! Override Watcher - Turns writes to the override file into redraws
//!
//! Another process can put a short message on the display by writing it to
//! a well-known file (default /tmp/oled_override.txt). Creating, modifying
//! or deleting that file wakes the screen and forces an immediate render.
//! Everything else happening in the same directory is ignored.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A single write shows up as several raw events (create, truncate, data).
/// Everything arriving within this window after the first is one change.
pub const COALESCE_WINDOW: Duration = Duration::from_millis(50);

/// Receives override file events.
pub trait OverrideSink: Send + Sync {
    fn on_override_event(&self);
}

pub struct OverrideWatcher {
    watcher: Option<RecommendedWatcher>,
    handle: Option<JoinHandle<()>>,
}

impl OverrideWatcher {
    pub fn start(path: &Path, sink: Arc<dyn OverrideSink>) -> Result<Self> {
        let file_name = path
            .file_name()
            .with_context(|| format!("override path {} has no file name", path.display()))?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let dir = parent
            .canonicalize()
            .with_context(|| format!("override directory {} not accessible", parent.display()))?;
        let target = dir.join(file_name);

        let (tx, rx) = mpsc::channel::<()>();
        let filter_target = target.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_override_event(&event, &filter_target) {
                    debug!("Override file event: {:?}", event.kind);
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!("Watch error: {:?}", e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;

        // The dispatch thread ends once the notify watcher (and with it the
        // sender) is dropped.
        let handle = thread::Builder::new()
            .name("override-watcher".to_string())
            .spawn(move || {
                while rx.recv().is_ok() {
                    thread::sleep(COALESCE_WINDOW);
                    let merged = rx.try_iter().count();
                    if merged > 0 {
                        debug!("Coalesced {} override events", merged + 1);
                    }
                    sink.on_override_event();
                }
                debug!("Override dispatch thread exited");
            })?;

        info!("Override watcher initialized on {}", target.display());

        Ok(Self {
            watcher: Some(watcher),
            handle: Some(handle),
        })
    }

    /// Stop watching and join the dispatch thread. Idempotent.
    pub fn stop(&mut self) {
        drop(self.watcher.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Override dispatch thread panicked");
            }
            info!("Override watcher stopped");
        }
    }
}

impl Drop for OverrideWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Create, modify or remove of exactly `target`.
pub fn is_override_event(event: &Event, target: &Path) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant && event.paths.iter().any(|p| p == target)
}

/// Current override message: trimmed file content, `None` when the file is
/// missing, unreadable or blank.
pub fn read_override_message(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let message = content.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
