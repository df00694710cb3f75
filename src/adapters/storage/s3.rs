//! S3-compatible uploader
//!
//! `PUT {endpoint}/{bucket}/{key}`. Request signing is left to a gateway in
//! front of the endpoint; an optional bearer token is forwarded.

use crate::adapters::storage::{check_response, object_key, public_url, CSV_CONTENT_TYPE};
use crate::adapters::traits::UploadGateway;
use crate::config::{bearer, S3Config};
use crate::domain::{CampexError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::path::Path;
use url::Url;

pub struct S3CompatibleUploader {
    http: reqwest::Client,
    config: S3Config,
    upload_path: String,
}

impl S3CompatibleUploader {
    pub fn new(http: reqwest::Client, config: S3Config, upload_path: String) -> Self {
        Self {
            http,
            config,
            upload_path,
        }
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.endpoint)
            .map_err(|e| CampexError::Storage(format!("Invalid S3 endpoint: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CampexError::Storage("S3 endpoint cannot be a base URL".to_string()))?
            .pop_if_empty()
            .push(&self.config.bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl UploadGateway for S3CompatibleUploader {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        let key = object_key(&self.upload_path, local_path)?;
        let body = tokio::fs::read(local_path).await.map_err(|e| {
            CampexError::Storage(format!("Failed to read {}: {e}", local_path.display()))
        })?;

        let mut request = self
            .http
            .put(self.object_url(&key)?)
            .header(CONTENT_TYPE, CSV_CONTENT_TYPE)
            .header("x-amz-bucket-region", &self.config.region);
        if let Some(ref token) = self.config.access_token {
            request = request.header(AUTHORIZATION, bearer(token));
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| CampexError::Storage(format!("S3 upload request failed: {e}")))?;
        check_response(response, "S3 upload").await?;

        let url = public_url(&self.config.public_base(), &key);
        tracing::info!(bucket = %self.config.bucket, key = %key, "Uploaded artifact to S3");
        Ok(url)
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}
