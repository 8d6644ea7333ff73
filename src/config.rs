// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables, plus the
//! user's segments file (alias table) with a single last-modified check.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{ActivityFilter, AliasTable, DateRange};

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Path to the stored OAuth tokens
    pub creds_file: PathBuf,
    /// Path to the segments config file (aliases); optional
    pub segments_file: Option<PathBuf>,
    /// Output KML path
    pub output_file: PathBuf,
    /// Date ranges to fetch, `[after, before)` in epoch seconds
    pub date_ranges: Vec<DateRange>,
    /// Activity filter built from the environment
    pub filter: ActivityFilter,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let after = parse_date_env("STRAVA_AFTER")?;
        let before = parse_date_env("STRAVA_BEFORE")?;
        let date_ranges = match (after, before) {
            (None, None) => Vec::new(),
            (a, b) => vec![DateRange::new(
                a.unwrap_or(0),
                b.unwrap_or(i64::MAX),
            )],
        };

        Ok(Self {
            strava_client_id: env::var("STRAVA_CLIENT_ID")
                .map_err(|_| Error::Config("STRAVA_CLIENT_ID is not set".to_string()))?,
            strava_client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| Error::Config("STRAVA_CLIENT_SECRET is not set".to_string()))?,
            creds_file: env::var("STRAVA_CREDS_FILE")
                .unwrap_or_else(|_| "strava-creds.json".to_string())
                .into(),
            segments_file: env::var("STRAVA_SEGMENTS_FILE").ok().map(PathBuf::from),
            output_file: env::var("KML_OUTPUT")
                .unwrap_or_else(|_| "activities.kml".to_string())
                .into(),
            date_ranges,
            filter: ActivityFilter {
                commute_only: env_flag("COMMUTE_ONLY"),
                non_commute_only: env_flag("NON_COMMUTE_ONLY"),
                include: env_list("ACTIVITY_INCLUDE"),
                exclude: env_list("ACTIVITY_EXCLUDE"),
            },
        })
    }
}

/// Parse a `YYYY-MM-DD` env var into epoch seconds (midnight UTC).
fn parse_date_env(name: &str) -> Result<Option<i64>> {
    match env::var(name) {
        Err(_) => Ok(None),
        Ok(raw) => {
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|e| Error::Config(format!("{}: {}", name, e)))?;
            let epoch = date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp())
                .ok_or_else(|| Error::Config(format!("{}: invalid date", name)))?;
            Ok(Some(epoch))
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_list(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

/// Parsed contents of the segments config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentsConfig {
    /// Free-text note about the file; ignored by processing.
    #[serde(default)]
    pub description: Option<String>,
    /// Raw segment name to canonical display name.
    #[serde(default)]
    pub alias: HashMap<String, String>,
}

/// Segments config file with last-modified tracking.
///
/// The alias table is read-only during a run; `reload_if_changed` is the
/// one mtime check performed between loading and running.
#[derive(Debug, Clone)]
pub struct SegmentsFile {
    path: PathBuf,
    modified: Option<SystemTime>,
    config: SegmentsConfig,
}

impl SegmentsFile {
    /// Load and parse the segments file, recording its mtime.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (config, modified) = Self::read(&path)?;
        tracing::info!(
            path = %path.display(),
            aliases = config.alias.len(),
            "Loaded segments file"
        );
        Ok(Self {
            path,
            modified,
            config,
        })
    }

    fn read(path: &Path) -> Result<(SegmentsConfig, Option<SystemTime>)> {
        let data = fs::read_to_string(path)?;
        let config: SegmentsConfig = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
        Ok((config, modified))
    }

    /// Re-read the file if its mtime changed since load. Returns whether a
    /// reload happened.
    pub fn reload_if_changed(&mut self) -> Result<bool> {
        let current = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        if current == self.modified {
            return Ok(false);
        }
        tracing::info!(path = %self.path.display(), "Segments file changed, reloading");
        let (config, modified) = Self::read(&self.path)?;
        self.config = config;
        self.modified = modified;
        Ok(true)
    }

    pub fn config(&self) -> &SegmentsConfig {
        &self.config
    }

    /// Build the run's alias table from the current file contents.
    pub fn alias_table(&self) -> AliasTable {
        self.config
            .alias
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
