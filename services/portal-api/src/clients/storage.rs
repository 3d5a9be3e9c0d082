//! Storage Service Client
//!
//! Uploads files (payment proofs, document resources) to the external
//! storage service and hands back the public URL.

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use abportal_utils::StorageConfig;

pub struct StorageClient {
    client: Client,
    upload_url: String,
    api_token: String,
}

/// Where an uploaded file ended up.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredFile {
    pub key: String,
    pub url: String,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// Upload a file and return its storage key and public URL.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StoredFile> {
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .context("Invalid content type for upload")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.api_token)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach storage service")?;

        if !response.status().is_success() {
            anyhow::bail!("Storage service returned {}", response.status());
        }

        response
            .json::<StoredFile>()
            .await
            .context("Failed to parse storage response")
    }
}
