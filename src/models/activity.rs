// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava activity model and the per-activity contracts consumed by the
//! KML exporter: metadata bag, filter predicate, start-date ordering, and
//! the geometry gate.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use geo::LineString;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::filter::{ActivityFilter, DateRange};
use crate::models::segment::SegmentEffort;
use crate::services::description::Extraction;
use crate::time_utils::format_duration;

/// Activity types that never carry map geometry.
const NO_TRACK_TYPES: [&str; 3] = ["Workout", "Yoga", "Weight Training"];

/// Metadata keys seeded from the summary record's physical fields.
///
/// Description-derived pairs may never overwrite these (additive, not
/// corrective).
const PHYSICAL_KEYS: [&str; 6] = [
    "distance",
    "total_elevation_gain",
    "moving_time",
    "elapsed_time",
    "average_temp",
    "device_name",
];

/// Summary activity record from `GET /athlete/activities`.
///
/// Shape validation happens here: a record without a numeric `id` and a
/// boolean `commute` is rejected outright.
#[derive(Debug, Clone, Deserialize)]
struct SummaryRecord {
    id: u64,
    commute: bool,
    name: String,
    #[serde(rename = "type")]
    activity_type: String,
    start_date: String,
    start_date_local: String,
    distance: f64,
    #[serde(default)]
    total_elevation_gain: f64,
    #[serde(default)]
    moving_time: u64,
    #[serde(default)]
    elapsed_time: u64,
    #[serde(default)]
    average_temp: Option<f64>,
    #[serde(default)]
    device_name: Option<String>,
}

/// One completed exercise session.
///
/// Constructed from a summary record, optionally enriched once with a
/// detailed record (metadata merge is additive, segment list is replaced),
/// then filtered in or out of the export set.
#[derive(Debug, Clone)]
pub struct Activity {
    pub id: u64,
    pub name: String,
    pub activity_type: String,
    pub commute: bool,
    /// Raw ISO-8601 start timestamp (UTC), as returned by Strava.
    pub start_date: String,
    /// Local-time start timestamp, used for display only.
    pub start_date_local: String,
    pub distance: f64,
    /// Parsed start timestamp; `None` if `start_date` failed to parse.
    start: Option<DateTime<Utc>>,
    /// Residual free-text description after key/value lines are stripped.
    description: Option<String>,
    /// Cached display string, computed at construction.
    display: String,
    /// Tracked metadata keys, in insertion order.
    keys: Vec<String>,
    metadata: HashMap<String, String>,
    /// Track coordinates (x = longitude, y = latitude); empty until
    /// populated from a stream fetch, immutable once set.
    track: LineString<f64>,
    segments: Vec<SegmentEffort>,
}

impl Activity {
    /// Build an activity from a raw summary JSON record.
    pub fn from_summary(value: &serde_json::Value) -> Result<Self> {
        let record: SummaryRecord = serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidRecord(format!("activity summary: {}", e)))?;

        let start = DateTime::parse_from_rfc3339(&record.start_date)
            .map(|dt| dt.with_timezone(&Utc))
            .ok();

        let local_date = record.start_date_local.get(..10).unwrap_or(&record.start_date_local);
        let display = format!(
            "{}, {} {} km, {}",
            local_date,
            record.activity_type,
            format_km(record.distance),
            record.name
        );

        let metadata = seed_physical_metadata(&record);

        Ok(Self {
            id: record.id,
            name: record.name,
            activity_type: record.activity_type,
            commute: record.commute,
            start_date: record.start_date,
            start_date_local: record.start_date_local,
            distance: record.distance,
            start,
            description: None,
            display,
            keys: PHYSICAL_KEYS.iter().map(|k| k.to_string()).collect(),
            metadata,
            track: LineString::new(Vec::new()),
            segments: Vec::new(),
        })
    }

    /// Cached display string: `"{local date}, {type} {km} km, {name}"`.
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn segments(&self) -> &[SegmentEffort] {
        &self.segments
    }

    /// Replace the segment-effort list. A second enrichment with the same
    /// detail fully supersedes the first, which keeps enrichment idempotent.
    pub(crate) fn set_segments(&mut self, segments: Vec<SegmentEffort>) {
        self.segments = segments;
    }

    /// Merge extracted description data into the metadata bag.
    ///
    /// Pairs are additive: a pair whose key belongs to the seeded
    /// physical-field set is ignored rather than overwriting it.
    pub(crate) fn merge_description(&mut self, extraction: Extraction) {
        for (key, value) in extraction.pairs {
            if PHYSICAL_KEYS.contains(&key.as_str()) {
                tracing::debug!(
                    activity_id = self.id,
                    key = %key,
                    "Description key collides with physical field, ignoring"
                );
                continue;
            }
            if !self.keys.iter().any(|k| *k == key) {
                self.keys.push(key.clone());
            }
            self.metadata.insert(key, value);
        }
        if let Some(residual) = extraction.residual {
            self.description = Some(residual);
            if !self.keys.iter().any(|k| k == "description") {
                self.keys.push("description".to_string());
            }
        }
    }

    /// Metadata entries in tracked-key order, skipping keys with no value.
    pub fn metadata(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys
            .iter()
            .filter_map(|k| self.metadata.get(k).map(|v| (k.as_str(), v.as_str())))
    }

    /// Tracked metadata keys, in insertion order.
    pub fn metadata_keys(&self) -> &[String] {
        &self.keys
    }

    /// Populate the track coordinates once; later calls are ignored.
    pub fn set_track(&mut self, track: LineString<f64>) {
        if !self.track.0.is_empty() {
            tracing::debug!(activity_id = self.id, "Track already set, ignoring");
            return;
        }
        self.track = track;
    }

    pub fn track(&self) -> &LineString<f64> {
        &self.track
    }

    /// Whether the KML exporter should be invoked for this activity.
    ///
    /// False for activity types that never produce map data (Workout, Yoga,
    /// Weight Training) and for activities with no coordinates.
    pub fn has_track_geometry(&self) -> bool {
        if NO_TRACK_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&self.activity_type))
        {
            return false;
        }
        !self.track.0.is_empty()
    }

    /// Filter predicate. Pure: no state beyond the activity and the filter.
    pub fn include(&self, filter: &ActivityFilter) -> bool {
        let commute_ok = (!filter.commute_only && !filter.non_commute_only)
            || (filter.commute_only && self.commute)
            || (filter.non_commute_only && !self.commute);
        if !commute_ok {
            return false;
        }
        if let Some(exclude) = &filter.exclude {
            if exclude.iter().any(|t| *t == self.activity_type) {
                return false;
            }
        }
        if let Some(include) = &filter.include {
            if !include.iter().any(|t| *t == self.activity_type) {
                return false;
            }
        }
        true
    }

    /// Total order by raw start-date string. Lexicographic comparison of the
    /// ISO-8601 strings is chronological; ties compare equal so a stable
    /// sort keeps input order.
    pub fn compare_start_date(a: &Self, b: &Self) -> Ordering {
        a.start_date.cmp(&b.start_date)
    }

    /// Start timestamp in epoch seconds, if the start date parsed.
    pub fn start_epoch(&self) -> Option<i64> {
        self.start.map(|dt| dt.timestamp())
    }

    /// Date-range membership: true with no ranges, otherwise true when the
    /// start timestamp falls inside any range.
    pub fn in_ranges(&self, ranges: &[DateRange]) -> bool {
        if ranges.is_empty() {
            return true;
        }
        match self.start_epoch() {
            Some(t) => ranges.iter().any(|r| r.contains(t)),
            None => false,
        }
    }
}

/// Metadata values for the seeded physical keys that are present.
fn seed_physical_metadata(record: &SummaryRecord) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("distance".to_string(), format!("{} m", record.distance));
    metadata.insert(
        "total_elevation_gain".to_string(),
        format!("{} m", record.total_elevation_gain),
    );
    metadata.insert(
        "moving_time".to_string(),
        format_duration(record.moving_time),
    );
    metadata.insert(
        "elapsed_time".to_string(),
        format_duration(record.elapsed_time),
    );
    if let Some(temp) = record.average_temp {
        metadata.insert("average_temp".to_string(), format!("{} C", temp));
    }
    if let Some(device) = &record.device_name {
        metadata.insert("device_name".to_string(), device.clone());
    }
    metadata
}

/// Distance in km, one decimal, trailing `.0` dropped ("10 km", "9.7 km").
fn format_km(distance_meters: f64) -> String {
    let km = (distance_meters / 100.0).round() / 10.0;
    if km.fract() == 0.0 {
        format!("{:.0}", km)
    } else {
        format!("{:.1}", km)
    }
}
