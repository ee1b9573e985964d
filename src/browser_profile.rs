//! Chrome profile directories for pooled browsers
//!
//! Each browser gets its own UUID-named profile so concurrent instances never
//! contend on Chrome's SingletonLock.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix shared by every profile directory this crate creates
pub const PROFILE_PREFIX: &str = "trending_harvest_chrome";

/// RAII wrapper for a Chrome profile directory
///
/// Removes the directory on drop unless `into_path()` hands ownership to
/// another cleanup mechanism.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the profile and return its path, disabling auto-cleanup
    pub fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            debug!("BrowserProfile cleanup: removing {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to cleanup profile directory {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Create a fresh profile directory under `base` named `{prefix}_{uuid}`.
pub fn create_unique_profile_in(base: &Path, prefix: &str) -> Result<BrowserProfile> {
    let path = base.join(format!("{prefix}_{}", Uuid::new_v4()));

    // create_dir (not create_dir_all) fails if the directory already exists
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

    debug!("Created Chrome profile directory: {}", path.display());
    Ok(BrowserProfile {
        path,
        cleanup_on_drop: true,
    })
}

/// Create a fresh profile directory in the system temp directory.
pub fn create_unique_profile() -> Result<BrowserProfile> {
    create_unique_profile_in(&std::env::temp_dir(), PROFILE_PREFIX)
}

/// Remove profile directories left behind by earlier crashed runs.
///
/// A directory still holding a `SingletonLock` belongs to a live browser and
/// is kept.
pub fn cleanup_stale_profiles_in(base: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(base)
        .with_context(|| format!("Failed to read directory: {}", base.display()))?;

    let mut cleaned = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_ours = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(PROFILE_PREFIX));
        if !is_ours || !path.is_dir() {
            continue;
        }

        let lock = path.join("SingletonLock");
        if lock.exists() || lock.is_symlink() {
            continue;
        }

        match std::fs::remove_dir_all(&path) {
            Ok(()) => cleaned += 1,
            Err(e) => warn!("Failed to remove stale profile {}: {}", path.display(), e),
        }
    }

    if cleaned > 0 {
        info!("Cleaned {} stale Chrome profile directories", cleaned);
    }
    Ok(cleaned)
}
