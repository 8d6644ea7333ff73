// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end enrichment pipeline tests over JSON fixtures.

use std::collections::HashMap;

use geo::LineString;
use serde_json::json;
use strava_kml::models::{ActivityFilter, AliasTable, DateRange, StarredSegments};
use strava_kml::services::{Enricher, KmlExporter, SkipReason};

fn summary(id: u64, start_date: &str, activity_type: &str, commute: bool) -> serde_json::Value {
    json!({
        "id": id,
        "commute": commute,
        "type": activity_type,
        "distance": 25000.0,
        "moving_time": 3600,
        "elapsed_time": 4000,
        "total_elevation_gain": 400.0,
        "start_date": start_date,
        "start_date_local": start_date,
        "name": format!("Activity {}", id)
    })
}

fn enricher() -> Enricher {
    let starred: StarredSegments =
        ["Hill Climb".to_string(), "River Sprint".to_string()].into_iter().collect();
    let aliases: AliasTable =
        [("Hill Climb".to_string(), "The Hill".to_string())].into_iter().collect();
    Enricher::new(starred, aliases)
}

#[test]
fn pipeline_enriches_filters_and_sorts() {
    let summaries = vec![
        summary(3, "2021-05-03T08:00:00Z", "Ride", false),
        summary(1, "2021-05-01T08:00:00Z", "Ride", false),
        summary(2, "2021-05-02T08:00:00Z", "Workout", false),
        summary(4, "2021-05-01T08:00:00Z", "Ride", true),
    ];

    let mut details = HashMap::new();
    details.insert(
        1,
        json!({
            "id": 1,
            "description": "bike = Roadie\nWindy on the ridge",
            "segment_efforts": [
                { "name": "Hill Climb", "elapsed_time": 312, "kom_rank": 8 },
                { "name": "Unknown Segment", "elapsed_time": 100 },
                { "name": "River Sprint", "elapsed_time": 45 }
            ]
        }),
    );

    let filter = ActivityFilter {
        non_commute_only: true,
        exclude: Some(vec!["Workout".to_string()]),
        ..Default::default()
    };

    let outcome = enricher().run(&summaries, &details, &[], &filter);

    // Commute and Workout dropped, rest sorted by start date
    let ids: Vec<u64> = outcome.activities.iter().map(|a| a.id).collect();
    assert_eq!(ids, [1, 3]);
    assert_eq!(outcome.skipped.len(), 2);
    assert!(outcome
        .skipped
        .iter()
        .all(|s| s.reason == SkipReason::FilteredOut));

    // Activity 1 was enriched: alias resolved, unknown segment dropped,
    // input order kept
    let enriched = &outcome.activities[0];
    let names: Vec<&str> = enriched.segments().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["The Hill", "River Sprint"]);
    assert_eq!(enriched.description(), Some("Windy on the ridge"));
    let bike = enriched
        .metadata()
        .find(|(k, _)| *k == "bike")
        .map(|(_, v)| v.to_string());
    assert_eq!(bike.as_deref(), Some("Roadie"));
}

#[test]
fn pipeline_output_cardinality_may_shrink() {
    let summaries = vec![
        summary(1, "2021-05-01T08:00:00Z", "Ride", false),
        json!({ "commute": false, "name": "broken" }),
    ];
    let outcome = enricher().run(
        &summaries,
        &HashMap::new(),
        &[],
        &ActivityFilter::default(),
    );
    assert_eq!(outcome.activities.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert!(matches!(
        outcome.skipped[0].reason,
        SkipReason::InvalidSummary(_)
    ));
    assert_eq!(outcome.skipped[0].index, 1);
}

#[test]
fn pipeline_date_range_is_half_open() {
    // 2021-05-01T08:00:00Z == 1619856000
    let summaries = vec![
        summary(1, "2021-05-01T08:00:00Z", "Ride", false),
        summary(2, "2021-05-02T08:00:00Z", "Ride", false),
    ];
    let ranges = [DateRange::new(1619856000, 1619942400)];
    let outcome = enricher().run(
        &summaries,
        &HashMap::new(),
        &ranges,
        &ActivityFilter::default(),
    );
    let ids: Vec<u64> = outcome.activities.iter().map(|a| a.id).collect();
    assert_eq!(ids, [1]);
    assert_eq!(outcome.skipped[0].reason, SkipReason::OutOfRange);
}

#[test]
fn equal_start_dates_keep_input_order() {
    let summaries = vec![
        summary(7, "2021-05-01T08:00:00Z", "Ride", false),
        summary(8, "2021-05-01T08:00:00Z", "Ride", false),
    ];
    let outcome = enricher().run(
        &summaries,
        &HashMap::new(),
        &[],
        &ActivityFilter::default(),
    );
    let ids: Vec<u64> = outcome.activities.iter().map(|a| a.id).collect();
    assert_eq!(ids, [7, 8]);
}

#[test]
fn filtered_set_exports_only_activities_with_geometry() {
    let summaries = vec![
        summary(1, "2021-05-01T08:00:00Z", "Ride", false),
        summary(2, "2021-05-02T08:00:00Z", "Ride", false),
    ];
    let mut outcome = enricher().run(
        &summaries,
        &HashMap::new(),
        &[],
        &ActivityFilter::default(),
    );

    outcome.activities[0].set_track(LineString::from(vec![(7.0, 46.0), (7.1, 46.1)]));

    let doc = KmlExporter::default().export(&outcome.activities);
    assert!(doc.contains("Activity 1"));
    assert!(!doc.contains("Activity 2"));
    assert!(doc.contains("<kml xmlns="));
}

#[test]
fn re_running_enrichment_with_same_detail_is_idempotent() {
    let enricher = enricher();
    let summaries = vec![summary(1, "2021-05-01T08:00:00Z", "Ride", false)];
    let detail = json!({
        "id": 1,
        "description": "bike = Roadie",
        "segment_efforts": [{ "name": "Hill Climb", "elapsed_time": 312 }]
    });

    let mut outcome = enricher.run(
        &summaries,
        &HashMap::from([(1, detail.clone())]),
        &[],
        &ActivityFilter::default(),
    );
    let activity = &mut outcome.activities[0];
    let segments_before = activity.segments().to_vec();
    let keys_before = activity.metadata_keys().to_vec();

    enricher.enrich_from_detail(activity, &detail).unwrap();

    assert_eq!(activity.segments(), segments_before.as_slice());
    for key in &keys_before {
        assert!(activity.metadata_keys().contains(key));
    }
}
