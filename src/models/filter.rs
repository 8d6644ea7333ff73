// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Date-range and activity-filter value objects.

use serde::{Deserialize, Serialize};

/// Half-open time interval `[after, before)` in Unix epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub after: i64,
    pub before: i64,
}

impl DateRange {
    pub fn new(after: i64, before: i64) -> Self {
        Self { after, before }
    }

    /// Membership test, half-open: `after <= t < before`.
    pub fn contains(&self, epoch_secs: i64) -> bool {
        epoch_secs >= self.after && epoch_secs < self.before
    }
}

/// Predicate configuration for selecting activities.
///
/// `commute_only` and `non_commute_only` are mutually exclusive in effect;
/// with both unset, commute status is not filtered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFilter {
    /// Keep only commute activities.
    #[serde(default)]
    pub commute_only: bool,
    /// Keep only non-commute activities.
    #[serde(default)]
    pub non_commute_only: bool,
    /// Allow-list of activity types; `None` allows all.
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// Deny-list of activity types.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
}
