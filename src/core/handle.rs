//! The deployment-configuration handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::core::RoleEnvironmentBuilder;
use crate::error::Result;
use crate::notify::{DirWatcher, SubscriberRegistry, SubscriptionHandle};
use crate::snapshot::Snapshot;
use crate::source::ConfigDirectory;

/// Interval between attempts to attach the watch to a directory that does
/// not exist yet.
const ATTACH_RETRY: Duration = Duration::from_millis(250);

/// Handle to a continuously refreshed deployment configuration.
///
/// The current [`Snapshot`] is stored behind an atomic pointer: readers get
/// a consistent, fully built value and never observe a partially constructed
/// one. A failed reload leaves the previously published snapshot in place.
///
/// # Examples
///
/// ```rust,no_run
/// use roleenv_config::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let env = RoleEnvironment::builder()
///     .directory("/etc/roleenv")
///     .build()
///     .await?;
///
/// let _subscription = env
///     .subscribe(|snapshot| {
///         println!("running as {}", snapshot.instance_id);
///     })
///     .await;
///
/// // Later, stop delivering notifications.
/// env.close().await;
/// # Ok(())
/// # }
/// ```
pub struct RoleEnvironment {
    inner: Arc<Shared>,
}

struct Shared {
    directory: ConfigDirectory,
    watcher: DirWatcher,
    current: ArcSwapOption<Snapshot>,
    subscribers: SubscriberRegistry,
    closed: AtomicBool,
    /// Next reload generation to hand out; the highest dispatched so far is
    /// one less.
    next_generation: AtomicU64,
    /// Serializes publication so callbacks observe snapshots in publish
    /// order.
    publish_gate: Mutex<()>,
}

impl RoleEnvironment {
    /// Create a new builder for constructing a configuration handle.
    pub fn builder() -> RoleEnvironmentBuilder {
        RoleEnvironmentBuilder::new()
    }

    pub(crate) fn with_parts(directory: ConfigDirectory, watcher: DirWatcher) -> Self {
        Self {
            inner: Arc::new(Shared {
                directory,
                watcher,
                current: ArcSwapOption::empty(),
                subscribers: SubscriberRegistry::new(),
                closed: AtomicBool::new(false),
                next_generation: AtomicU64::new(1),
                publish_gate: Mutex::new(()),
            }),
        }
    }

    /// The current snapshot, or `None` if no load has succeeded yet.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.current.load_full()
    }

    /// Whether [`close`](RoleEnvironment::close) has completed or begun.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Register a consumer callback.
    ///
    /// The callback is invoked immediately with the current snapshot when one
    /// exists, then once per subsequent successful reload that changes the
    /// configuration. No callback fires after
    /// [`close`](RoleEnvironment::close). Dropping the returned handle
    /// unsubscribes.
    pub async fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(Arc<Snapshot>) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let registered = Arc::clone(&callback);
        let handle = self
            .inner
            .subscribers
            .subscribe(move |snapshot| (*registered)(snapshot))
            .await;

        if !self.is_closed() {
            if let Some(snapshot) = self.snapshot() {
                (*callback)(snapshot);
            }
        }

        handle
    }

    /// Manually run one full reload pass and publish the result.
    ///
    /// # Errors
    ///
    /// Any [`crate::error::ConfigError`] from the load pipeline. The
    /// previously published snapshot is untouched on failure.
    pub async fn reload(&self) -> Result<()> {
        let generation = self.inner.begin_generation();
        let snapshot = self.inner.directory.load().await?;
        self.inner.publish(snapshot, generation).await;
        Ok(())
    }

    /// Stop delivering change-triggered reloads and release the watch
    /// resource. Idempotent.
    ///
    /// In-flight reloads are not aborted, but their results are discarded:
    /// the dispatcher checks the closed flag before publishing or invoking
    /// any callback. Errors surfacing from the closing watch handle are
    /// swallowed by the watcher's event callback.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wait out an in-flight publish; anything arriving later sees the
        // closed flag, so no callback fires once close completes.
        drop(self.inner.publish_gate.lock().await);
        self.inner.watcher.detach().await;
        info!(dir = %self.inner.directory.path().display(), "stopped monitoring configuration");
    }

    pub(crate) async fn attach_watch(&self) -> Result<()> {
        self.inner.watcher.watch(self.inner.directory.path()).await
    }

    /// Drive change-triggered reloads until the watcher detaches. When the
    /// watch could not be attached at build time, keep retrying so a
    /// directory created later self-heals.
    pub(crate) fn spawn_reload_loop(&self, mut triggers: mpsc::Receiver<()>, attached: bool) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if !attached {
                loop {
                    tokio::time::sleep(ATTACH_RETRY).await;
                    if inner.closed.load(Ordering::Acquire) {
                        return;
                    }
                    match inner.watcher.watch(inner.directory.path()).await {
                        Ok(()) => {
                            info!(dir = %inner.directory.path().display(), "watch attached");
                            // One immediate pass picks up files written
                            // before the watch took effect.
                            inner.reload_and_publish().await;
                            break;
                        }
                        Err(err) => debug!(error = %err, "watch attach retry failed"),
                    }
                }
            }

            while triggers.recv().await.is_some() {
                if inner.closed.load(Ordering::Acquire) {
                    break;
                }
                inner.reload_and_publish().await;
            }
        });
    }
}

impl Clone for RoleEnvironment {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Shared {
    fn begin_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::AcqRel)
    }

    async fn reload_and_publish(&self) {
        let generation = self.begin_generation();
        match self.directory.load().await {
            Ok(snapshot) => self.publish(snapshot, generation).await,
            Err(err) => {
                warn!(error = %err, "configuration reload failed, keeping previous snapshot");
            }
        }
    }

    async fn publish(&self, snapshot: Snapshot, generation: u64) {
        let _gate = self.publish_gate.lock().await;

        if self.closed.load(Ordering::Acquire) {
            return;
        }

        // Only the most recently dispatched reload may publish; an older,
        // slower pipeline must not overwrite a fresher result.
        let newest = self.next_generation.load(Ordering::Acquire) - 1;
        if generation != newest {
            debug!(generation, newest, "discarding stale reload result");
            return;
        }

        let snapshot = Arc::new(snapshot);
        let previous = self.current.swap(Some(Arc::clone(&snapshot)));

        // An unchanged configuration is not a change; coalesced duplicate
        // events must not double-notify.
        if previous.as_deref() == Some(&*snapshot) {
            return;
        }

        self.subscribers.notify_all(&snapshot).await;
    }
}
