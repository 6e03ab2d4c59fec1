use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::CatalogConfig;
use crate::error::{AppError, Result};
use crate::models::{FeatureReading, TrackDetails};

use super::Catalog;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    artists: Option<SearchPage>,
    tracks: Option<SearchPage>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    album: Option<AlbumRef>,
    popularity: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    id: Option<String>,
    release_date: Option<String>,
}

#[derive(Clone, Copy)]
enum SearchKind {
    Artist,
    Track,
}

impl SearchKind {
    fn as_str(self) -> &'static str {
        match self {
            SearchKind::Artist => "artist",
            SearchKind::Track => "track",
        }
    }
}

/// Spotify Web API client holding one client-credentials token for the
/// lifetime of the process. The token is never refreshed.
pub struct SpotifyClient {
    client: Client,
    api_base: Url,
    access_token: String,
}

impl SpotifyClient {
    pub async fn connect(config: &CatalogConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("hit-charts/1.0")
            .build()?;

        let api_base = parse_api_base(&config.api_base)?;
        let access_token = request_token(&client, config).await?;
        tracing::debug!("Obtained catalog access token");

        Ok(Self {
            client,
            api_base,
            access_token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|e| AppError::Config(format!("invalid catalog path '{}': {}", path, e)))
    }

    async fn search(&self, query: &str, kind: SearchKind) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.endpoint("search")?)
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("type", kind.as_str()), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::CatalogApi(format!(
                "{} search for '{}' failed: HTTP {}",
                kind.as_str(),
                query,
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(first_hit(body, kind))
    }
}

impl Catalog for SpotifyClient {
    async fn search_artist(&self, name: &str) -> Result<Option<String>> {
        self.search(name, SearchKind::Artist).await
    }

    async fn search_track(&self, title: &str) -> Result<Option<String>> {
        self.search(&format!("track:{}", title), SearchKind::Track)
            .await
    }

    async fn track_details(&self, track_id: &str) -> Result<Option<TrackDetails>> {
        let response = self
            .client
            .get(self.endpoint(&format!("tracks/{}", track_id))?)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!("Track {} lookup returned HTTP {}", track_id, response.status());
            return Ok(None);
        }

        let track: TrackResponse = response.json().await?;
        Ok(Some(details_from_track(track)))
    }

    async fn audio_features(&self, track_id: &str) -> Result<Option<FeatureReading>> {
        let response = self
            .client
            .get(self.endpoint(&format!("audio-features/{}", track_id))?)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Error fetching audio features for {}: HTTP {} {}",
                track_id,
                status,
                error_text
            );
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }
}

async fn request_token(client: &Client, config: &CatalogConfig) -> Result<String> {
    let response = client
        .post(&config.token_url)
        .header(AUTHORIZATION, basic_auth_value(&config.client_id, &config.client_secret))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await?;
        return Err(AppError::CatalogApi(format!(
            "token request failed: HTTP {} {}",
            status, error_text
        )));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

fn basic_auth_value(client_id: &str, client_secret: &str) -> String {
    let encoded = STANDARD.encode(format!("{}:{}", client_id, client_secret));
    format!("Basic {}", encoded)
}

/// Relative joins only append to a base that ends in `/`.
fn parse_api_base(raw: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&with_slash)
        .map_err(|e| AppError::Config(format!("invalid api_base '{}': {}", raw, e)))
}

fn first_hit(body: SearchResponse, kind: SearchKind) -> Option<String> {
    let page = match kind {
        SearchKind::Artist => body.artists,
        SearchKind::Track => body.tracks,
    };
    page?.items.into_iter().next().map(|item| item.id)
}

fn details_from_track(track: TrackResponse) -> TrackDetails {
    let (album_id, release_date) = match track.album {
        Some(album) => (album.id, album.release_date),
        None => (None, None),
    };
    TrackDetails {
        album_id,
        release_date,
        popularity: track.popularity,
    }
}
