// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-KML driver.
//!
//! Fetches the athlete's activities and starred segments, runs the
//! enrichment pipeline, and writes the KML document. Network fetches are
//! sequential; a failed detail or stream fetch only degrades that one
//! activity.

use std::collections::HashMap;

use strava_kml::{
    config::{Config, SegmentsFile},
    models::{AliasTable, StarredSegments},
    services::{strava, CredsFile, Enricher, KmlExporter, StravaClient, StravaSession},
    Error,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(output = %config.output_file.display(), "Starting Strava-KML export");

    // Segments file is optional; without it there are no aliases.
    let mut segments_file = match &config.segments_file {
        Some(path) => Some(SegmentsFile::load(path)?),
        None => None,
    };

    let client = StravaClient::new(
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
    );
    let session = StravaSession::new(client.clone(), CredsFile::new(&config.creds_file));
    let token = match session.access_token().await {
        Ok(token) => token,
        Err(e @ Error::Creds(_)) => {
            // First run: complete the OAuth flow from an authorization code.
            if let Ok(code) = std::env::var("STRAVA_AUTH_CODE") {
                session.authorize(code.trim()).await?;
                session.access_token().await?
            } else {
                tracing::error!(
                    url = %client.authorization_url(
                        "http://localhost",
                        "read_all,activity:read_all",
                        ""
                    ),
                    "No stored credentials; open the authorization URL and set STRAVA_AUTH_CODE"
                );
                return Err(e.into());
            }
        }
        Err(e) => return Err(e.into()),
    };

    let athlete = client.get_athlete(&token).await?;
    tracing::info!(
        athlete_id = athlete.id,
        name = %format!("{} {}", athlete.firstname, athlete.lastname),
        "Authenticated"
    );

    // Starred segments form the membership filter for effort collection.
    let starred_records = client.get_starred_segments(&token).await?;
    let starred = StarredSegments::from_records(&starred_records);
    tracing::info!(count = starred.len(), "Fetched starred segments");

    // Pick up alias edits made since the file was first loaded.
    let aliases = match segments_file.as_mut() {
        Some(file) => {
            file.reload_if_changed()?;
            file.alias_table()
        }
        None => AliasTable::default(),
    };

    // Fetch summaries for each requested range (whole history when none).
    let mut summaries = Vec::new();
    if config.date_ranges.is_empty() {
        let now = chrono::Utc::now().timestamp();
        summaries = client.list_all_activities(&token, 0, now).await?;
    } else {
        for range in &config.date_ranges {
            summaries.extend(
                client
                    .list_all_activities(&token, range.after, range.before)
                    .await?,
            );
        }
    }

    // Fetch details per activity; a failed fetch degrades to summary-only.
    let mut details = HashMap::new();
    for summary in &summaries {
        let Some(id) = summary.get("id").and_then(|v| v.as_u64()) else {
            continue;
        };
        match client.get_activity(&token, id).await {
            Ok(detail) => {
                details.insert(id, detail);
            }
            Err(e) => {
                tracing::warn!(activity_id = id, error = %e, "Detail fetch failed, using summary only");
            }
        }
    }

    let enricher = Enricher::new(starred, aliases);
    let mut outcome = enricher.run(&summaries, &details, &config.date_ranges, &config.filter);

    for skip in &outcome.skipped {
        tracing::info!(index = skip.index, id = ?skip.id, reason = ?skip.reason, "Activity skipped");
    }

    // Populate tracks for the surviving activities, falling back to the
    // detail polyline when the stream fetch fails.
    for activity in &mut outcome.activities {
        match client.get_activity_track(&token, activity.id).await {
            Ok(Some(track)) => activity.set_track(track),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(activity_id = activity.id, error = %e, "Stream fetch failed");
                if let Some(encoded) = details
                    .get(&activity.id)
                    .and_then(strava::polyline_from_detail)
                {
                    match strava::track_from_polyline(encoded) {
                        Ok(track) => activity.set_track(track),
                        Err(e) => {
                            tracing::warn!(activity_id = activity.id, error = %e, "Polyline fallback failed")
                        }
                    }
                }
            }
        }
    }

    let kml = KmlExporter::default().export(&outcome.activities);
    std::fs::write(&config.output_file, kml)?;
    tracing::info!(
        activities = outcome.activities.len(),
        skipped = outcome.skipped.len(),
        output = %config.output_file.display(),
        "Export complete"
    );

    Ok(())
}

/// Initialize logging with an env-filter (RUST_LOG).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava_kml=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
