// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Summary activity listing with date-range pagination
//! - Detailed activity and starred-segment fetching
//! - Track coordinate streams (with polyline fallback)
//! - OAuth code exchange and token refresh
//! - Rate limit detection

use geo::LineString;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Default page size for activity listing.
const ACTIVITIES_PER_PAGE: u32 = 100;

/// Strava API client.
#[derive(Debug, Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://www.strava.com/api/v3".to_string(),
            oauth_url: "https://www.strava.com/oauth".to_string(),
            client_id,
            client_secret,
        }
    }

    /// Override the API base URLs (for tests against a local server).
    pub fn with_base_url(mut self, base_url: &str, oauth_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.oauth_url = oauth_url.trim_end_matches('/').to_string();
        self
    }

    /// Build the user-facing authorization URL for the OAuth flow.
    pub fn authorization_url(&self, redirect_uri: &str, scope: &str, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&redirect_uri={}&scope={}&state={}&approval_prompt=auto&response_type=code",
            self.oauth_url,
            self.client_id,
            urlencoding::encode(redirect_uri),
            scope,
            state
        )
    }

    /// Get the authenticated athlete profile.
    pub async fn get_athlete(&self, access_token: &str) -> Result<StravaAthlete> {
        let url = format!("{}/athlete", self.base_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// Fetch one page of summary activities inside `[after, before)`.
    ///
    /// Records are returned as raw JSON values; shape validation is the
    /// enrichment pipeline's job, per record.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: i64,
        before: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/athlete/activities", self.base_url);
        self.get_json(
            &url,
            access_token,
            &[
                ("after", after.to_string()),
                ("before", before.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        )
        .await
    }

    /// Fetch all summary activities inside `[after, before)`, following
    /// pages until a short page signals the end.
    pub async fn list_all_activities(
        &self,
        access_token: &str,
        after: i64,
        before: i64,
    ) -> Result<Vec<serde_json::Value>> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let batch = self
                .list_activities(access_token, after, before, page, ACTIVITIES_PER_PAGE)
                .await?;
            let fetched = batch.len();
            all.extend(batch);
            if fetched < ACTIVITIES_PER_PAGE as usize {
                break;
            }
            page += 1;
        }
        tracing::info!(count = all.len(), after, before, "Fetched activity summaries");
        Ok(all)
    }

    /// Get a detailed activity by ID, as raw JSON.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);
        self.get_json(&url, access_token, &[]).await
    }

    /// Get the athlete's starred segments.
    pub async fn get_starred_segments(
        &self,
        access_token: &str,
    ) -> Result<Vec<crate::models::segment::StarredSegmentRecord>> {
        let url = format!("{}/segments/starred", self.base_url);
        self.get_json(&url, access_token, &[("per_page", "200".to_string())])
            .await
    }

    /// Fetch an activity's latlng stream as a line string.
    ///
    /// Returns `None` when the activity has no coordinate stream.
    pub async fn get_activity_track(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<Option<LineString<f64>>> {
        let url = format!("{}/activities/{}/streams", self.base_url, activity_id);
        let streams: StreamSet = self
            .get_json(
                &url,
                access_token,
                &[
                    ("keys", "latlng".to_string()),
                    ("key_by_type", "true".to_string()),
                ],
            )
            .await?;

        Ok(streams
            .latlng
            .filter(|s| !s.data.is_empty())
            .map(|s| track_from_latlng(&s.data)))
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let url = format!("{}/token", self.oauth_url);
        let response = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::StravaApi(format!("Token request failed: {}", e)))?;

        Self::check_response_json(response).await
    }

    /// Generic GET request with bearer auth and JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::StravaApi(e.to_string()))?;

        Self::check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(Error::StravaApi(Error::STRAVA_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 {
                return Err(Error::StravaApi(Error::STRAVA_TOKEN_ERROR.to_string()));
            }

            return Err(Error::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Token response from Strava OAuth (exchange or refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Athlete profile, trimmed to the fields we report.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    pub firstname: String,
    pub lastname: String,
}

/// Stream response with `key_by_type=true`.
#[derive(Debug, Clone, Deserialize)]
struct StreamSet {
    #[serde(default)]
    latlng: Option<LatLngStream>,
}

#[derive(Debug, Clone, Deserialize)]
struct LatLngStream {
    data: Vec<[f64; 2]>,
}

/// Convert a latlng stream (lat, lng pairs) into a line string (x = lng).
fn track_from_latlng(data: &[[f64; 2]]) -> LineString<f64> {
    LineString::from(
        data.iter()
            .map(|pair| (pair[1], pair[0]))
            .collect::<Vec<_>>(),
    )
}

/// Decode an encoded map polyline (Strava format, precision 5).
///
/// Fallback track source for activities whose stream fetch failed.
pub fn track_from_polyline(encoded: &str) -> Result<LineString<f64>> {
    polyline::decode_polyline(encoded, 5)
        .map_err(|e| Error::StravaApi(format!("Polyline decode error: {}", e)))
}

/// Pull the map polyline out of a raw detailed-activity record, preferring
/// the full polyline over the summary one.
pub fn polyline_from_detail(detail: &serde_json::Value) -> Option<&str> {
    let map = detail.get("map")?;
    map.get("polyline")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            map.get("summary_polyline")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaSession - client plus on-disk credential rotation
// ─────────────────────────────────────────────────────────────────────────────

use crate::services::creds::{CredsFile, StravaCreds};
use chrono::Utc;

/// Strava client bound to a local credential file.
///
/// Reads tokens from disk, refreshes them when expiring (with the margin
/// from the creds module), and writes rotated tokens back through.
#[derive(Debug, Clone)]
pub struct StravaSession {
    client: StravaClient,
    creds_file: CredsFile,
}

impl StravaSession {
    pub fn new(client: StravaClient, creds_file: CredsFile) -> Self {
        Self { client, creds_file }
    }

    pub fn client(&self) -> &StravaClient {
        &self.client
    }

    /// Get a valid access token, refreshing and rotating on disk if needed.
    pub async fn access_token(&self) -> Result<String> {
        let creds = self.creds_file.read()?.ok_or_else(|| {
            Error::Creds(format!(
                "no stored credentials at {}; authorize first",
                self.creds_file.path().display()
            ))
        })?;

        if creds.is_valid(Utc::now()) {
            return Ok(creds.access_token);
        }

        tracing::info!("Access token expired, refreshing");
        let refreshed = self.client.refresh_token(&creds.refresh_token).await?;
        self.store(&refreshed)?;
        Ok(refreshed.access_token)
    }

    /// Complete the OAuth flow: exchange the code and persist the tokens.
    pub async fn authorize(&self, code: &str) -> Result<()> {
        let tokens = self.client.exchange_code(code).await?;
        self.store(&tokens)?;
        Ok(())
    }

    fn store(&self, tokens: &TokenResponse) -> Result<()> {
        self.creds_file.write(&StravaCreds {
            token_type: "Bearer".to_string(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at,
        })
    }
}
