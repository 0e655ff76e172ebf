//! Component I — the filesystem watcher.
//!
//! Watches a source directory for changes and re-runs the pipeline
//! driver on a debounce timer, emitting one `WatchEvent` per rebuild.
//! Built on `notify`, the same crate `aetherlight-core` uses for its
//! own filesystem watch loop.
//!
//! The debounce is a single mutable slot behind a mutex rather than a
//! queue: while a rebuild is pending, further filesystem events only
//! refresh the pending deadline, so a burst of saves from an editor
//! collapses into exactly one rebuild.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use notify::{DebouncedEvent, RecommendedWatcher, RecursiveMode, Watcher};

use crate::driver::{build, BuildResult, PipelineOptions};

#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The build that runs once at startup, before any filesystem event
    /// is observed.
    InitialBuilt(BuildResult),
    /// The initial build failed; the watcher keeps running.
    InitialBuildFailed(String),
    /// A debounced rebuild ran successfully.
    Built(BuildResult),
    /// A debounced rebuild failed; the watcher keeps running.
    BuildFailed(String),
}

#[derive(Clone)]
pub struct WatchOptions {
    pub pipeline: PipelineOptions,
    pub debounce: Duration,
    /// Only events touching a path with this suffix trigger a rebuild.
    pub source_suffix: String,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            pipeline: PipelineOptions::default(),
            debounce: Duration::from_millis(300),
            source_suffix: ".go".to_string(),
        }
    }
}

/// A path is watch-relevant if it (or none of its ancestors up to
/// `root`) lies inside a hidden directory, and its own name ends with
/// the configured source suffix.
fn is_relevant(path: &Path, root: &Path, suffix: &str) -> bool {
    if path.file_name().and_then(|n| n.to_str()).map(|n| n.ends_with(suffix)) != Some(true) {
        return false;
    }
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root {
            break;
        }
        if dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            == Some(true)
        {
            return false;
        }
        current = dir.parent();
    }
    true
}

/// Only `write` and `create` events trigger a rebuild, per the watcher
/// contract.
fn event_paths(event: &DebouncedEvent) -> Vec<&Path> {
    match event {
        DebouncedEvent::Create(p) | DebouncedEvent::Write(p) => vec![p.as_path()],
        _ => vec![],
    }
}

/// Watch `root` and call `on_event` for every debounced rebuild, until
/// `should_stop` returns true. Blocks the calling thread; callers that
/// want a background watch should spawn this onto its own thread.
pub fn watch(
    root: impl AsRef<Path>,
    options: &WatchOptions,
    mut on_event: impl FnMut(WatchEvent),
    mut should_stop: impl FnMut() -> bool,
) -> crate::Result<()> {
    let root = root.as_ref().to_path_buf();
    let (tx, rx) = channel();

    let mut watcher: RecommendedWatcher = RecommendedWatcher::new(tx, options.debounce)
        .map_err(|e| format_err!("failed to start filesystem watcher: {}", e))?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| format_err!("failed to watch {}: {}", root.display(), e))?;

    // The initial build runs exactly once at startup, before any event
    // is observed — but not if the caller already wants to stop.
    if should_stop() {
        return Ok(());
    }
    match build(&root, &options.pipeline) {
        Ok(result) => on_event(WatchEvent::InitialBuilt(result)),
        Err(e) => {
            warn!("initial build failed: {}", e);
            on_event(WatchEvent::InitialBuildFailed(e.to_string()));
        }
    }

    let pending: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

    loop {
        if should_stop() {
            return Ok(());
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                debug!("filesystem event: {:?}", event);
                let relevant = event_paths(&event)
                    .into_iter()
                    .any(|p| is_relevant(p, &root, &options.source_suffix));
                if relevant {
                    *pending.lock().expect("watch debounce lock poisoned") =
                        Some(Instant::now() + options.debounce);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }

        let fire = {
            let mut slot = pending.lock().expect("watch debounce lock poisoned");
            match *slot {
                Some(deadline) if Instant::now() >= deadline => {
                    *slot = None;
                    true
                }
                _ => false,
            }
        };

        if fire {
            rebuild(&root, options, &mut on_event);
        }
    }
}

fn rebuild(root: &PathBuf, options: &WatchOptions, on_event: &mut impl FnMut(WatchEvent)) {
    info!("rebuilding {} after filesystem change", root.display());
    match build(root, &options.pipeline) {
        Ok(result) => on_event(WatchEvent::Built(result)),
        Err(e) => {
            warn!("rebuild failed: {}", e);
            on_event(WatchEvent::BuildFailed(e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn stops_promptly_when_should_stop_is_already_true() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let result = watch(
            dir.path(),
            &WatchOptions::default(),
            move |_event| {
                calls2.fetch_add(1, Ordering::SeqCst);
            },
            || true,
        );
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debounced_rebuild_fires_after_a_file_write() {
        let dir = tempfile::tempdir().unwrap();
        let events: Arc<Mutex<Vec<WatchEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events2 = events.clone();
        let dir_path = dir.path().to_path_buf();

        let handle = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            watch(
                &dir_path,
                &WatchOptions {
                    pipeline: PipelineOptions::default(),
                    debounce: Duration::from_millis(50),
                    source_suffix: ".go".to_string(),
                },
                move |event| events2.lock().unwrap().push(event),
                move || Instant::now() > deadline,
            )
        });

        thread::sleep(Duration::from_millis(100));
        std::fs::write(
            dir.path().join("app.go"),
            r#"var X = &corev1.ConfigMap{ Name: "x" }"#,
        )
        .unwrap();

        handle.join().unwrap().unwrap();
        assert!(!events.lock().unwrap().is_empty());
    }

    #[test]
    fn initial_build_runs_before_any_event() {
        let dir = tempfile::tempdir().unwrap();
        let events: Arc<Mutex<Vec<WatchEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events2 = events.clone();
        let result = watch(
            dir.path(),
            &WatchOptions::default(),
            move |event| events2.lock().unwrap().push(event),
            || true,
        );
        assert!(result.is_ok());
        let recorded = events.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(
            recorded[0],
            WatchEvent::InitialBuilt(_) | WatchEvent::InitialBuildFailed(_)
        ));
    }

    #[test]
    fn non_source_suffix_is_not_relevant() {
        let root = Path::new("/repo");
        assert!(!is_relevant(Path::new("/repo/README.md"), root, ".go"));
        assert!(is_relevant(Path::new("/repo/app.go"), root, ".go"));
    }

    #[test]
    fn hidden_directories_are_not_relevant() {
        let root = Path::new("/repo");
        assert!(!is_relevant(Path::new("/repo/.git/app.go"), root, ".go"));
        assert!(!is_relevant(Path::new("/repo/sub/.hidden/app.go"), root, ".go"));
    }
}
