//! Directory scanning and latest-file selection.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::source::CONFIG_MARKER;

/// A marker-matching configuration file and its modification timestamp.
#[derive(Debug)]
pub(crate) struct Candidate {
    pub(crate) path: PathBuf,
    pub(crate) modified: SystemTime,
}

/// List the directory and keep `.xml` entries whose content carries the
/// configuration marker.
///
/// Entries are processed strictly sequentially, one outstanding read or stat
/// at a time, so selection stays deterministic and at most one descriptor is
/// open per pass. Unreadable candidates and candidates whose metadata cannot
/// be obtained are logged and excluded, not treated as fatal.
///
/// # Errors
///
/// [`ConfigError::DirectoryRead`] if the directory cannot be listed,
/// including when it does not exist.
pub(crate) async fn scan_candidates(dir: &Path) -> Result<Vec<Candidate>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|source| ConfigError::DirectoryRead {
            dir: dir.to_path_buf(),
            source,
        })?;

    let mut candidates = Vec::new();
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|source| ConfigError::DirectoryRead {
                dir: dir.to_path_buf(),
                source,
            })?;
        let Some(entry) = entry else { break };

        let path = entry.path();
        let is_xml = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if !is_xml {
            continue;
        }

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable candidate");
                continue;
            }
        };
        if !content.contains(CONFIG_MARKER) {
            debug!(path = %path.display(), "skipping XML file without configuration marker");
            continue;
        }

        let modified = match fs::metadata(&path).await.and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(source) => {
                let err = ConfigError::Stat { path, source };
                warn!(error = %err, "excluding candidate from selection");
                continue;
            }
        };

        candidates.push(Candidate { path, modified });
    }

    Ok(candidates)
}

/// Pick the candidate with the strictly greatest modification timestamp.
///
/// Only a strictly later timestamp displaces the current best, so the
/// first-scanned candidate wins a tie. Deterministic but arbitrary, and
/// deliberately kept that way.
///
/// # Errors
///
/// [`ConfigError::NoCandidateFile`] if the candidate set is empty.
pub(crate) fn select_latest(candidates: Vec<Candidate>, dir: &Path) -> Result<PathBuf> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        let newer = best
            .as_ref()
            .is_none_or(|current| candidate.modified > current.modified);
        if newer {
            best = Some(candidate);
        }
    }

    best.map(|candidate| candidate.path)
        .ok_or_else(|| ConfigError::NoCandidateFile {
            dir: dir.to_path_buf(),
        })
}
