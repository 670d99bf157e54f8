//! Persisted whole-feed sync state.
//!
//! A small `{etag, last_modified, hash}` record lets a run exit before any
//! per-event work when the upstream document is untouched. The file is
//! written with a temp-then-rename so a crash never leaves a torn record; an
//! unreadable file is simply "no prior state" and triggers a full resync.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{IcsyncError, IcsyncResult};

/// Revision markers for the feed document as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub hash: Option<String>,
}

impl SyncState {
    /// Load prior state; anything unreadable counts as no prior state.
    pub fn load(path: &Path) -> SyncState {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => SyncState::default(),
        }
    }

    /// Atomically overwrite the state file.
    pub fn save(&self, path: &Path) -> IcsyncResult<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| IcsyncError::Serialization(e.to_string()))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// md5 hex digest, used for the whole-document hash and event fingerprints.
pub fn md5_hex(bytes: &[u8]) -> String {
    let digest = Md5::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
