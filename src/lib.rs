// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-KML: export Strava activities as annotated KML tracks.
//!
//! This crate fetches an athlete's activities and starred segments from
//! Strava, enriches each activity with description metadata and matched
//! segment efforts, and renders the filtered set as a KML document.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

pub use config::Config;
pub use error::{Error, Result};
