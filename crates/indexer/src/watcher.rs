//! Live change watching.
//!
//! One notifier thread per configured root feeds a shared changed-set; the
//! coordinator drains it into the `.qgc` changes file. Small change sets
//! are flushed promptly; once the set outgrows the repack threshold the
//! coordinator instead waits for the notification storm to quiesce and
//! hands the whole project to the repack callback.

use crate::changes::{collect_changes, remove_changes_file, write_changes_file};
use crate::config::ProjectConfig;
use crate::error::Result;
use crate::scanner::{normalize_path, own_file_names, FileScanner};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use packgrep_pack::{read_pack_file_list, FileInfo};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Change-set size beyond which a repack beats incremental updates.
pub const WATCH_UPDATE_THRESHOLD_FILES: usize = 512;

/// How long the filesystem must stay quiet before an oversized change-set
/// escalates to a repack.
pub const WATCH_UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub update_threshold_files: usize,
    pub update_timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            update_threshold_files: WATCH_UPDATE_THRESHOLD_FILES,
            update_timeout: WATCH_UPDATE_TIMEOUT,
        }
    }
}

#[derive(Default)]
struct ChangedSet {
    paths: BTreeSet<String>,
    last: String,
}

struct Shared {
    changed: Mutex<ChangedSet>,
    wakeup: Condvar,
    stopped: AtomicBool,
}

impl Shared {
    fn insert(&self, path: String) {
        let mut changed = self.changed.lock().unwrap();
        changed.paths.insert(path.clone());
        changed.last = path;
        self.wakeup.notify_one();
    }
}

/// Remote control for a running [`WatchSession`], safe to use from any
/// thread.
#[derive(Clone)]
pub struct WatchHandle {
    shared: Arc<Shared>,
}

impl WatchHandle {
    /// Record a changed path, exactly as a filesystem notification would.
    pub fn notify_change(&self, path: &str) {
        self.shared.insert(path.to_string());
    }

    pub fn changed_count(&self) -> usize {
        self.shared.changed.lock().unwrap().paths.len()
    }

    /// Ask the session to shut down: wakes the coordinator and every
    /// notifier thread.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.wakeup.notify_all();
    }
}

/// A watch over one project: notifier threads plus the coordinator state.
pub struct WatchSession {
    config: Arc<ProjectConfig>,
    options: WatchConfig,
    shared: Arc<Shared>,
    notifiers: Vec<JoinHandle<()>>,
}

impl WatchSession {
    /// Load the project and start watching its roots. Notifiers run from
    /// this point on, so changes made while [`run`](Self::run) reconciles
    /// the pack are not lost.
    pub fn start(project: impl AsRef<Path>, options: WatchConfig) -> Result<Self> {
        let config = Arc::new(ProjectConfig::load(project)?);
        let shared = Arc::new(Shared {
            changed: Mutex::new(ChangedSet::default()),
            wakeup: Condvar::new(),
            stopped: AtomicBool::new(false),
        });

        let own = Arc::new(own_file_names(&config));
        let mut notifiers = Vec::new();
        for root in config.roots() {
            log::info!("Watching folder {}", root.display());
            let root = root.clone();
            let config = Arc::clone(&config);
            let shared = Arc::clone(&shared);
            let own = Arc::clone(&own);
            notifiers.push(std::thread::spawn(move || {
                let on_change = |path: &Path| file_changed(&shared, &config, &own, path);
                if !watch_directory(&root, &shared.stopped, &on_change) {
                    log::error!("Error watching folder {}", root.display());
                }
                log::info!("No longer watching folder {}", root.display());
            }));
        }

        Ok(Self {
            config,
            options,
            shared,
            notifiers,
        })
    }

    pub fn handle(&self) -> WatchHandle {
        WatchHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Reconcile the pack against the disk, then coordinate until stopped.
    ///
    /// `repack` is invoked whenever an oversized change-set quiesces; it is
    /// expected to rebuild the pack and remove the changes file (see
    /// [`update_project`](crate::update_project)). A failed repack is
    /// logged and watching continues.
    pub fn run(mut self, mut repack: impl FnMut() -> Result<()>) -> Result<()> {
        let changes_path = self.config.changes_path();

        log::info!("Scanning project...");
        let current: Vec<FileInfo> = FileScanner::new(&self.config)
            .scan()
            .into_iter()
            .map(|f| f.info)
            .collect();

        log::info!("Reading data pack...");
        let pack = read_pack_file_list(self.config.pack_path())?;

        remove_changes_file(&changes_path)?;
        let seed = collect_changes(&current, &pack);
        {
            let mut changed = self.shared.changed.lock().unwrap();
            changed.paths.extend(seed.iter().cloned());
            if let Some(last) = seed.last() {
                changed.last = last.clone();
            }
        }

        if seed.is_empty() {
            log::info!("Listening for changes");
        } else {
            log::info!("{} files changed; listening for further changes", seed.len());
        }
        write_changes_file(&changes_path, &seed)?;

        let mut snapshot = seed;
        loop {
            if self.shared.stopped.load(Ordering::SeqCst) {
                break;
            }

            let update_needed = snapshot.len() > self.options.update_threshold_files;
            let mut update_now = false;

            let last = {
                let mut changed = self.shared.changed.lock().unwrap();

                if update_needed {
                    let (guard, timeout) = self
                        .shared
                        .wakeup
                        .wait_timeout(changed, self.options.update_timeout)
                        .unwrap();
                    changed = guard;
                    if timeout.timed_out() {
                        // the storm has passed; hand everything to the repack
                        update_now = true;
                        changed.paths.clear();
                    }
                } else {
                    let snapshot_len = snapshot.len();
                    let stopped = &self.shared.stopped;
                    changed = self
                        .shared
                        .wakeup
                        .wait_while(changed, |c| {
                            c.paths.len() == snapshot_len && !stopped.load(Ordering::SeqCst)
                        })
                        .unwrap();
                }

                snapshot = changed.paths.iter().cloned().collect();
                changed.last.clone()
            };

            if self.shared.stopped.load(Ordering::SeqCst) {
                break;
            }

            if update_now {
                if let Err(err) = repack() {
                    log::error!("Project update failed: {err}");
                }
            } else {
                log::info!(
                    "{} files changed; last: {}",
                    snapshot.len(),
                    shorten_for_display(&last)
                );
                if let Err(err) = write_changes_file(&changes_path, &snapshot) {
                    log::error!("Error saving changes to {}: {err}", changes_path.display());
                }
            }
        }

        for notifier in self.notifiers.drain(..) {
            let _ = notifier.join();
        }
        Ok(())
    }
}

fn file_changed(
    shared: &Shared,
    config: &ProjectConfig,
    own: &std::collections::HashSet<String>,
    path: &Path,
) {
    let name = normalize_path(config.base(), path);
    if name.is_empty() || own.contains(&name) || !config.is_file_acceptable(&name) {
        return;
    }
    shared.insert(name);
}

/// Block watching one directory tree, invoking `on_change` for every
/// reported path until `stopped` is raised. Returns false when the watch
/// could not be established.
fn watch_directory(dir: &Path, stopped: &AtomicBool, on_change: &dyn Fn(&Path)) -> bool {
    let (tx, rx) = mpsc::channel();
    let mut watcher = match RecommendedWatcher::new(
        move |event| {
            let _ = tx.send(event);
        },
        notify::Config::default(),
    ) {
        Ok(watcher) => watcher,
        Err(err) => {
            log::error!("Watcher init failed: {err}");
            return false;
        }
    };

    if let Err(err) = watcher.watch(dir, RecursiveMode::Recursive) {
        log::error!("Failed to watch {}: {err}", dir.display());
        return false;
    }

    while !stopped.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Ok(event)) => {
                for path in &event.paths {
                    on_change(path);
                }
            }
            Ok(Err(err)) => log::warn!("Watcher error: {err}"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    true
}

/// Status-line rendering of the most recent path, capped at 40 columns.
fn shorten_for_display(path: &str) -> String {
    const WIDTH: usize = 40;
    if path.len() <= WIDTH {
        return path.to_string();
    }
    let mut cut = path.len() - (WIDTH - 3);
    while !path.is_char_boundary(cut) {
        cut += 1;
    }
    format!("...{}", &path[cut..])
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.wakeup.notify_all();
        for notifier in self.notifiers.drain(..) {
            let _ = notifier.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shorten_keeps_short_paths() {
        assert_eq!(shorten_for_display("src/main.rs"), "src/main.rs");
    }

    #[test]
    fn test_shorten_truncates_to_width() {
        let long = "a/".repeat(40) + "tail.rs";
        let shown = shorten_for_display(&long);
        assert_eq!(shown.len(), 40);
        assert!(shown.starts_with("..."));
        assert!(shown.ends_with("tail.rs"));
    }

    #[test]
    fn test_shared_insert_tracks_last() {
        let shared = Shared {
            changed: Mutex::new(ChangedSet::default()),
            wakeup: Condvar::new(),
            stopped: AtomicBool::new(false),
        };

        shared.insert("b.rs".to_string());
        shared.insert("a.rs".to_string());

        let changed = shared.changed.lock().unwrap();
        assert_eq!(changed.paths.len(), 2);
        assert_eq!(changed.last, "a.rs");
    }
}
