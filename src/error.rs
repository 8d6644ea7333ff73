// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Validation failures (`InvalidRecord`) are per-activity: they remove one
//! activity from the working set and are collected into the pipeline's skip
//! manifest, never aborting the run. Everything else is fatal for the
//! operation that raised it.

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Credential error: {0}")]
    Creds(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Message marker for an invalid or expired Strava token.
    pub const STRAVA_TOKEN_ERROR: &'static str = "strava_token_invalid";

    /// Message marker for Strava's rate limit (HTTP 429).
    pub const STRAVA_RATE_LIMIT: &'static str = "strava_rate_limit";

    /// True if this error indicates an invalid or expired Strava token.
    pub fn is_strava_token_error(&self) -> bool {
        matches!(self, Error::StravaApi(msg) if msg.contains(Self::STRAVA_TOKEN_ERROR))
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
