// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Segment efforts, the starred-segment registry, and alias resolution.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One timed traversal of a segment, as attached to an activity.
///
/// Value object: owned exclusively by the activity it was collected for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentEffort {
    /// Canonical segment name (after alias resolution).
    pub name: String,
    /// Elapsed time for the effort in seconds.
    pub elapsed_time: u64,
    /// KOM rank for the effort, when Strava reports one.
    pub rank: Option<u32>,
}

/// Raw segment effort as returned inside a detailed activity.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSegmentEffort {
    pub name: String,
    pub elapsed_time: u64,
    #[serde(default)]
    pub kom_rank: Option<u32>,
}

/// User-configured mapping from raw segment name to preferred display name.
///
/// Built once from the segments config file; read-only during a run. Lookup
/// is case-sensitive and exact on the trimmed raw name.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    /// Resolve a raw segment name to its canonical display name.
    ///
    /// Total: absence of an alias is not an error, the trimmed raw name is
    /// returned unchanged.
    pub fn resolve(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self.aliases.get(trimmed) {
            Some(canonical) => canonical.clone(),
            None => trimmed.to_string(),
        }
    }
}

impl FromIterator<(String, String)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            aliases: iter.into_iter().collect(),
        }
    }
}

/// The set of segment names the user has starred on Strava.
///
/// Membership is tested on the raw effort name, before alias resolution; an
/// effort whose name is absent is dropped entirely.
#[derive(Debug, Clone, Default)]
pub struct StarredSegments {
    names: HashSet<String>,
}

impl StarredSegments {
    /// Build the registry from starred-segment summary records.
    pub fn from_records(records: &[StarredSegmentRecord]) -> Self {
        Self {
            names: records.iter().map(|r| r.name.clone()).collect(),
        }
    }

    pub fn contains(&self, raw_name: &str) -> bool {
        self.names.contains(raw_name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for StarredSegments {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Starred segment record from `GET /segments/starred`.
///
/// Strava returns many more fields; only the name matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct StarredSegmentRecord {
    pub name: String,
}
