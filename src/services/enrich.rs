// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity enrichment pipeline.
//!
//! Handles the core workflow:
//! 1. Build activities from summary records (per-item validation)
//! 2. Merge each optional detailed record: description metadata + starred
//!    segment efforts
//! 3. Apply date ranges and the activity filter
//! 4. Stable-sort the surviving set by start date
//!
//! Failures are local to one activity and collected into a skip manifest;
//! the pipeline never aborts on a bad record.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{
    Activity, ActivityFilter, AliasTable, DateRange, RawSegmentEffort, SegmentEffort,
    StarredSegments,
};
use crate::services::description;

/// Detailed activity record from `GET /activities/{id}`.
#[derive(Debug, Clone, Deserialize)]
struct DetailRecord {
    id: u64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    segment_efforts: Vec<RawSegmentEffort>,
}

/// Enriches activities using the run's read-only starred-segment registry
/// and alias table.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    starred: StarredSegments,
    aliases: AliasTable,
}

impl Enricher {
    pub fn new(starred: StarredSegments, aliases: AliasTable) -> Self {
        Self { starred, aliases }
    }

    /// Filter raw efforts down to starred segments, resolving aliases.
    ///
    /// Output order equals input order; Strava's own effort ordering is
    /// authoritative. Repeated segment names are kept (a segment climbed
    /// twice yields two efforts).
    pub fn collect_efforts(&self, efforts: &[RawSegmentEffort]) -> Vec<SegmentEffort> {
        efforts
            .iter()
            .filter_map(|effort| {
                if !self.starred.contains(&effort.name) {
                    tracing::debug!(segment = %effort.name, "Segment not starred, skipping");
                    return None;
                }
                let name = self.aliases.resolve(&effort.name);
                tracing::info!(
                    segment = %name,
                    elapsed = %crate::time_utils::format_duration(effort.elapsed_time),
                    "Found starred segment"
                );
                Some(SegmentEffort {
                    name,
                    elapsed_time: effort.elapsed_time,
                    rank: effort.kom_rank,
                })
            })
            .collect()
    }

    /// Merge a detailed record into an activity.
    ///
    /// A non-empty description is parsed into metadata (additive merge); a
    /// non-empty effort list replaces the activity's segment list, so
    /// re-enriching with the same detail is idempotent.
    pub fn enrich_from_detail(
        &self,
        activity: &mut Activity,
        detail: &serde_json::Value,
    ) -> Result<()> {
        let record: DetailRecord = serde_json::from_value(detail.clone())
            .map_err(|e| Error::InvalidRecord(format!("activity detail: {}", e)))?;

        if record.id != activity.id {
            return Err(Error::InvalidRecord(format!(
                "detail id {} does not match activity {}",
                record.id, activity.id
            )));
        }

        tracing::debug!(activity = %activity.display(), "Adding activity details");

        if let Some(text) = record.description.as_deref() {
            if !text.is_empty() {
                activity.merge_description(description::extract(text));
            }
        }

        if !record.segment_efforts.is_empty() {
            activity.set_segments(self.collect_efforts(&record.segment_efforts));
        }

        Ok(())
    }

    /// Run the full enrichment pipeline over raw summary records.
    ///
    /// `details` maps activity id to its detailed record; an activity with
    /// no entry proceeds with summary-only data (soft failure upstream).
    /// Activities are processed in input order; the result is stable-sorted
    /// by start date. Output cardinality may be less than input cardinality;
    /// the manifest says why.
    pub fn run(
        &self,
        summaries: &[serde_json::Value],
        details: &HashMap<u64, serde_json::Value>,
        ranges: &[DateRange],
        filter: &ActivityFilter,
    ) -> PipelineOutcome {
        let mut activities = Vec::new();
        let mut skipped = Vec::new();

        for (index, summary) in summaries.iter().enumerate() {
            let mut activity = match Activity::from_summary(summary) {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping invalid summary record");
                    skipped.push(SkippedActivity {
                        index,
                        id: summary.get("id").and_then(|v| v.as_u64()),
                        reason: SkipReason::InvalidSummary(e.to_string()),
                    });
                    continue;
                }
            };

            match details.get(&activity.id) {
                Some(detail) => {
                    if let Err(e) = self.enrich_from_detail(&mut activity, detail) {
                        tracing::warn!(
                            activity_id = activity.id,
                            error = %e,
                            "Skipping activity with invalid detail record"
                        );
                        skipped.push(SkippedActivity {
                            index,
                            id: Some(activity.id),
                            reason: SkipReason::InvalidDetail(e.to_string()),
                        });
                        continue;
                    }
                }
                None => {
                    tracing::debug!(
                        activity_id = activity.id,
                        "No detail record, using summary-only data"
                    );
                }
            }

            if !activity.in_ranges(ranges) {
                skipped.push(SkippedActivity {
                    index,
                    id: Some(activity.id),
                    reason: SkipReason::OutOfRange,
                });
                continue;
            }

            if !activity.include(filter) {
                skipped.push(SkippedActivity {
                    index,
                    id: Some(activity.id),
                    reason: SkipReason::FilteredOut,
                });
                continue;
            }

            activities.push(activity);
        }

        // sort_by is stable: equal start dates keep input order
        activities.sort_by(|a, b| Activity::compare_start_date(a, b));

        PipelineOutcome {
            activities,
            skipped,
        }
    }
}

/// Result of a pipeline run: the surviving activities plus a manifest of
/// every dropped input.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub activities: Vec<Activity>,
    pub skipped: Vec<SkippedActivity>,
}

/// One dropped input record and why it was dropped.
#[derive(Debug, Clone)]
pub struct SkippedActivity {
    /// Position in the input summary list.
    pub index: usize,
    /// Activity id, when one could be read from the record.
    pub id: Option<u64>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Summary record failed shape validation.
    InvalidSummary(String),
    /// Detail record failed shape validation.
    InvalidDetail(String),
    /// Start date outside every requested date range.
    OutOfRange,
    /// Rejected by the activity filter.
    FilteredOut,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enricher() -> Enricher {
        let starred: StarredSegments = ["Hill Climb".to_string()].into_iter().collect();
        let aliases: AliasTable =
            [("Hill Climb".to_string(), "The Hill".to_string())].into_iter().collect();
        Enricher::new(starred, aliases)
    }

    fn raw_effort(name: &str, elapsed: u64) -> RawSegmentEffort {
        serde_json::from_value(json!({ "name": name, "elapsed_time": elapsed })).unwrap()
    }

    fn summary(id: u64) -> serde_json::Value {
        json!({
            "id": id,
            "commute": false,
            "type": "Ride",
            "distance": 10000.0,
            "moving_time": 1800,
            "elapsed_time": 2000,
            "total_elevation_gain": 250.0,
            "start_date": "2021-05-01T10:00:00Z",
            "start_date_local": "2021-05-01T03:00:00Z",
            "name": "Morning Ride"
        })
    }

    #[test]
    fn test_collect_applies_alias_and_starred_filter() {
        let efforts = vec![raw_effort("Hill Climb", 300), raw_effort("Other Climb", 200)];
        let collected = enricher().collect_efforts(&efforts);
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].name, "The Hill");
        assert_eq!(collected[0].elapsed_time, 300);
    }

    #[test]
    fn test_collect_keeps_input_order_and_duplicates() {
        let starred: StarredSegments =
            ["A".to_string(), "B".to_string()].into_iter().collect();
        let enricher = Enricher::new(starred, AliasTable::default());
        let efforts = vec![
            raw_effort("B", 10),
            raw_effort("A", 20),
            raw_effort("B", 30),
        ];
        let collected = enricher.collect_efforts(&efforts);
        let names: Vec<&str> = collected.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["B", "A", "B"]);
        assert!(collected.len() <= efforts.len());
    }

    #[test]
    fn test_enrich_merges_description_and_segments() {
        let enricher = enricher();
        let mut activity = Activity::from_summary(&summary(1)).unwrap();
        let detail = json!({
            "id": 1,
            "description": "shoes = Speedster\nGreat climb today",
            "segment_efforts": [
                { "name": "Hill Climb", "elapsed_time": 300 },
                { "name": "Other Climb", "elapsed_time": 200 }
            ]
        });

        enricher.enrich_from_detail(&mut activity, &detail).unwrap();

        assert_eq!(activity.description(), Some("Great climb today"));
        let shoes = activity
            .metadata()
            .find(|(k, _)| *k == "shoes")
            .map(|(_, v)| v.to_string());
        assert_eq!(shoes.as_deref(), Some("Speedster"));
        assert_eq!(activity.segments().len(), 1);
        assert_eq!(activity.segments()[0].name, "The Hill");
    }

    #[test]
    fn test_enrich_twice_is_idempotent() {
        let enricher = enricher();
        let mut activity = Activity::from_summary(&summary(1)).unwrap();
        let detail = json!({
            "id": 1,
            "description": "shoes = Speedster\nGreat climb today",
            "segment_efforts": [{ "name": "Hill Climb", "elapsed_time": 300 }]
        });

        enricher.enrich_from_detail(&mut activity, &detail).unwrap();
        let keys_after_first: Vec<String> = activity.metadata_keys().to_vec();
        let segments_after_first = activity.segments().to_vec();

        enricher.enrich_from_detail(&mut activity, &detail).unwrap();

        // segment list fully superseded, not appended
        assert_eq!(activity.segments(), segments_after_first.as_slice());
        // every key from the first pass survives the second
        for key in &keys_after_first {
            assert!(activity.metadata_keys().contains(key));
        }
    }

    #[test]
    fn test_enrich_rejects_mismatched_detail() {
        let enricher = enricher();
        let mut activity = Activity::from_summary(&summary(1)).unwrap();
        let detail = json!({ "id": 2, "description": "x" });
        assert!(matches!(
            enricher.enrich_from_detail(&mut activity, &detail),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_pipeline_collects_skip_manifest() {
        let enricher = enricher();
        let summaries = vec![
            summary(1),
            json!({ "id": "not-a-number", "commute": false }),
            summary(3),
        ];
        let mut details = HashMap::new();
        details.insert(3, json!({ "id": 3, "segment_efforts": "wrong shape" }));

        let outcome = enricher.run(&summaries, &details, &[], &ActivityFilter::default());

        assert_eq!(outcome.activities.len(), 1);
        assert_eq!(outcome.activities[0].id, 1);
        assert_eq!(outcome.skipped.len(), 2);
        assert!(matches!(
            outcome.skipped[0].reason,
            SkipReason::InvalidSummary(_)
        ));
        assert!(matches!(
            outcome.skipped[1].reason,
            SkipReason::InvalidDetail(_)
        ));
    }

    #[test]
    fn test_pipeline_missing_detail_is_soft() {
        let enricher = enricher();
        let outcome = enricher.run(
            &[summary(1)],
            &HashMap::new(),
            &[],
            &ActivityFilter::default(),
        );
        assert_eq!(outcome.activities.len(), 1);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_pipeline_applies_filter_and_ranges() {
        let enricher = enricher();
        let mut commute = summary(2);
        commute["commute"] = json!(true);
        let mut early = summary(3);
        early["start_date"] = json!("2019-01-01T00:00:00Z");

        let filter = ActivityFilter {
            non_commute_only: true,
            ..Default::default()
        };
        // [2021-01-01, 2022-01-01)
        let ranges = [DateRange::new(1609459200, 1640995200)];

        let outcome = enricher.run(
            &[summary(1), commute, early],
            &HashMap::new(),
            &ranges,
            &filter,
        );

        assert_eq!(outcome.activities.len(), 1);
        assert_eq!(outcome.activities[0].id, 1);
        let reasons: Vec<&SkipReason> = outcome.skipped.iter().map(|s| &s.reason).collect();
        assert_eq!(reasons, [&SkipReason::FilteredOut, &SkipReason::OutOfRange]);
    }

    #[test]
    fn test_pipeline_sorts_by_start_date() {
        let enricher = enricher();
        let mut later = summary(1);
        later["start_date"] = json!("2021-06-01T10:00:00Z");
        let outcome = enricher.run(
            &[later, summary(2)],
            &HashMap::new(),
            &[],
            &ActivityFilter::default(),
        );
        let ids: Vec<u64> = outcome.activities.iter().map(|a| a.id).collect();
        assert_eq!(ids, [2, 1]);
    }
}
