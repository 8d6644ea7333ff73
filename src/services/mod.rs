// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod creds;
pub mod description;
pub mod enrich;
pub mod kml;
pub mod strava;

pub use creds::{CredsFile, StravaCreds};
pub use enrich::{Enricher, PipelineOutcome, SkipReason, SkippedActivity};
pub use kml::KmlExporter;
pub use strava::{StravaClient, StravaSession};
