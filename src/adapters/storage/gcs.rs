//! Google Cloud Storage uploader
//!
//! Uses the JSON API simple upload:
//! `POST {api_base}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={key}`
//! with a pre-issued OAuth bearer token.

use crate::adapters::storage::{check_response, object_key, public_url, CSV_CONTENT_TYPE};
use crate::adapters::traits::UploadGateway;
use crate::config::{bearer, GcsConfig};
use crate::domain::{CampexError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::path::Path;
use url::Url;

pub struct GcsUploader {
    http: reqwest::Client,
    config: GcsConfig,
    upload_path: String,
}

impl GcsUploader {
    pub fn new(http: reqwest::Client, config: GcsConfig, upload_path: String) -> Self {
        Self {
            http,
            config,
            upload_path,
        }
    }

    fn upload_url(&self, key: &str) -> Result<Url> {
        let base = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.bucket
        );
        Url::parse_with_params(&base, &[("uploadType", "media"), ("name", key)])
            .map_err(|e| CampexError::Storage(format!("Invalid GCS upload URL: {e}")))
    }
}

#[async_trait]
impl UploadGateway for GcsUploader {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        let key = object_key(&self.upload_path, local_path)?;
        let body = tokio::fs::read(local_path).await.map_err(|e| {
            CampexError::Storage(format!("Failed to read {}: {e}", local_path.display()))
        })?;

        let response = self
            .http
            .post(self.upload_url(&key)?)
            .header(AUTHORIZATION, bearer(&self.config.access_token))
            .header(CONTENT_TYPE, CSV_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| CampexError::Storage(format!("GCS upload request failed: {e}")))?;
        check_response(response, "GCS upload").await?;

        let url = public_url(&self.config.public_base(), &key);
        tracing::info!(bucket = %self.config.bucket, key = %key, "Uploaded artifact to GCS");
        Ok(url)
    }

    fn backend(&self) -> &'static str {
        "gcs"
    }
}
