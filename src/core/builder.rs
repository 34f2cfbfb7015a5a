//! Builder for constructing [`RoleEnvironment`] handles.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::RoleEnvironment;
use crate::error::Result;
use crate::notify::DirWatcher;
use crate::source::ConfigDirectory;

/// Environment variable overriding the monitored directory when the builder
/// is not given one explicitly.
pub const CONFIG_DIR_ENV: &str = "ROLEENV_CONFIG_DIR";

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Builder for a [`RoleEnvironment`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use roleenv_config::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let env = RoleEnvironment::builder()
///     .directory("/etc/roleenv")
///     .debounce(Duration::from_millis(200))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct RoleEnvironmentBuilder {
    directory: Option<PathBuf>,
    debounce: Duration,
}

impl RoleEnvironmentBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            directory: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Set the monitored directory explicitly.
    ///
    /// When unset, the directory comes from the `ROLEENV_CONFIG_DIR`
    /// environment variable, falling back to the platform default
    /// (`C:\config` on Windows, `/etc/roleenv` elsewhere).
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Quiet period applied to bursts of filesystem change events before a
    /// reload is triggered.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Perform the initial load, start watching, and return the handle.
    ///
    /// An initial-load failure is logged and leaves the handle without a
    /// snapshot; watching begins regardless, so a directory that does not
    /// exist yet (or is still empty) self-heals once files appear.
    ///
    /// # Errors
    ///
    /// Returns an error only if the watch resource itself cannot be created.
    pub async fn build(self) -> Result<RoleEnvironment> {
        let dir = self.directory.unwrap_or_else(default_directory);
        info!(dir = %dir.display(), "loading deployment configuration");

        let (watcher, triggers) = DirWatcher::new(self.debounce)?;
        let env = RoleEnvironment::with_parts(ConfigDirectory::new(dir), watcher);

        // First snapshot, if the directory already holds a valid file.
        if let Err(err) = env.reload().await {
            warn!(error = %err, "initial configuration load failed");
        }

        // Watching starts whether or not the initial load succeeded.
        let attached = match env.attach_watch().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "cannot watch configuration directory yet, will retry");
                false
            }
        };

        env.spawn_reload_loop(triggers, attached);
        Ok(env)
    }
}

impl Default for RoleEnvironmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_directory() -> PathBuf {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if cfg!(windows) {
        PathBuf::from(r"C:\config")
    } else {
        PathBuf::from("/etc/roleenv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_directory_and_debounce() {
        let builder = RoleEnvironmentBuilder::new()
            .directory("/tmp/cfg")
            .debounce(Duration::from_millis(100));

        assert_eq!(
            builder.directory.as_deref(),
            Some(std::path::Path::new("/tmp/cfg"))
        );
        assert_eq!(builder.debounce, Duration::from_millis(100));
    }

    #[test]
    fn default_debounce_applies() {
        let builder = RoleEnvironmentBuilder::new();
        assert!(builder.directory.is_none());
        assert_eq!(builder.debounce, DEFAULT_DEBOUNCE);
    }
}
