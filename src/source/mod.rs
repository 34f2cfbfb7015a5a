//! Locating and loading the current configuration from the monitored
//! directory.

mod scan;
mod xml;

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::snapshot::Snapshot;

/// Marker substring distinguishing genuine deployment-config XML from
/// unrelated XML files in the same directory.
pub(crate) const CONFIG_MARKER: &str = "<RDConfig";

/// Handle to the monitored directory.
///
/// Each [`load`](ConfigDirectory::load) call runs one full
/// scan → select → parse → transform pass and builds a fresh [`Snapshot`].
#[derive(Debug, Clone)]
pub struct ConfigDirectory {
    dir: PathBuf,
}

impl ConfigDirectory {
    /// Create a handle for the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The monitored directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Run one full load pass.
    ///
    /// The whole directory is rescanned every time; no attempt is made to
    /// interpret which file changed since the previous pass, which keeps the
    /// pipeline resilient to arbitrary add/remove/rename sequences and to
    /// events delivered out of order.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from scanning, selection, reading, parsing or the
    /// schema walk. All of them are local to this one pass.
    pub async fn load(&self) -> Result<Snapshot> {
        let candidates = scan::scan_candidates(&self.dir).await?;
        let selected = scan::select_latest(candidates, &self.dir)?;
        debug!(file = %selected.display(), "selected deployment configuration");

        let content = fs::read_to_string(&selected)
            .await
            .map_err(|source| ConfigError::FileRead {
                path: selected.clone(),
                source,
            })?;

        xml::parse_snapshot(&content, &selected)
    }
}
