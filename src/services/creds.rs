// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-disk OAuth credential persistence.
//!
//! Tokens are stored in a local JSON file and rotated in place whenever a
//! refresh succeeds.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Stored Strava OAuth tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaCreds {
    /// Token type, normally "Bearer".
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token, Unix epoch seconds.
    pub expires_at: i64,
}

impl StravaCreds {
    /// True when the access token is still usable at `now`, with the
    /// refresh margin applied.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() + TOKEN_REFRESH_MARGIN_SECS < self.expires_at
    }
}

/// Credential file on disk.
#[derive(Debug, Clone)]
pub struct CredsFile {
    path: PathBuf,
}

impl CredsFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read stored credentials; `None` if the file does not exist yet.
    pub fn read(&self) -> Result<Option<StravaCreds>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)?;
        let creds = serde_json::from_str(&data)
            .map_err(|e| Error::Creds(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(creds))
    }

    /// Write credentials, replacing any previous tokens.
    pub fn write(&self, creds: &StravaCreds) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(creds)
            .map_err(|e| Error::Creds(e.to_string()))?;
        fs::write(&self.path, data)?;
        tracing::info!(path = %self.path.display(), "Credentials written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn creds(expires_at: i64) -> StravaCreds {
        StravaCreds {
            token_type: "Bearer".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_is_valid_applies_margin() {
        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
        assert!(creds(1_000_000 + TOKEN_REFRESH_MARGIN_SECS + 1).is_valid(now));
        assert!(!creds(1_000_000 + TOKEN_REFRESH_MARGIN_SECS).is_valid(now));
        assert!(!creds(999_000).is_valid(now));
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = CredsFile::new(dir.path().join("creds.json"));
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = CredsFile::new(dir.path().join("creds.json"));
        file.write(&creds(12345)).unwrap();

        let loaded = file.read().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token, "refresh");
        assert_eq!(loaded.expires_at, 12345);
    }

    #[test]
    fn test_read_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CredsFile::new(&path).read(),
            Err(Error::Creds(_))
        ));
    }
}
