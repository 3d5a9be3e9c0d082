//! Playlist API Client
//!
//! Fetches playlist metadata for playlist resources. The playlist API is
//! decorative for the portal's core flows, so every failure degrades to
//! "no metadata" with a log line.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use abportal_utils::PlaylistConfig;

pub struct PlaylistClient {
    client: Client,
    api_url: String,
    api_key: String,
}

/// Metadata the playlist API knows about a playlist.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistMetadata {
    pub title: Option<String>,
    pub item_count: Option<u32>,
    pub thumbnail_url: Option<String>,
}

impl PlaylistClient {
    pub fn new(config: &PlaylistConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch metadata for a playlist, or `None` when the API is unreachable,
    /// errors, or does not know the playlist.
    pub async fn fetch_metadata(&self, playlist_id: &str) -> Option<PlaylistMetadata> {
        match self.try_fetch(playlist_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Playlist metadata fetch for {} failed: {}", playlist_id, e);
                None
            }
        }
    }

    async fn try_fetch(&self, playlist_id: &str) -> Result<Option<PlaylistMetadata>> {
        let url = format!("{}/playlists/{}", self.api_url, playlist_id);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to query playlist API")?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let metadata: PlaylistMetadata = response
            .json()
            .await
            .context("Failed to parse playlist response")?;

        Ok(Some(metadata))
    }
}
