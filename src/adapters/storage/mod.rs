//! Upload gateways
//!
//! Every backend stores an artifact under `upload_path + file name` and
//! returns `{public_base}/{upload_path}{file name}`.
//!
//! - [`GcsUploader`] - Google Cloud Storage JSON upload API
//! - [`S3CompatibleUploader`] - plain HTTP `PUT` to an S3-compatible endpoint
//! - [`LocalUploader`] - copies into a local directory

pub mod gcs;
pub mod local;
pub mod s3;

pub use gcs::GcsUploader;
pub use local::LocalUploader;
pub use s3::S3CompatibleUploader;

use crate::adapters::traits::UploadGateway;
use crate::config::{StorageBackend, StorageConfig};
use crate::domain::{CampexError, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Content type of every uploaded artifact
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Object key for a local artifact
pub fn object_key(upload_path: &str, local_path: &Path) -> Result<String> {
    let file_name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            CampexError::Storage(format!(
                "Artifact path has no usable file name: {}",
                local_path.display()
            ))
        })?;
    Ok(format!("{upload_path}{file_name}"))
}

/// Durable URL of an object
pub fn public_url(public_base: &str, key: &str) -> String {
    format!("{}/{key}", public_base.trim_end_matches('/'))
}

/// Builds the configured upload gateway
pub fn build_uploader(config: &StorageConfig) -> Result<Arc<dyn UploadGateway>> {
    let http = || {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CampexError::Storage(format!("Failed to build HTTP client: {e}")))
    };
    let missing = |section: &str| {
        CampexError::Configuration(format!(
            "storage.{section} is required for the selected backend"
        ))
    };

    let uploader: Arc<dyn UploadGateway> = match config.backend {
        StorageBackend::Gcs => {
            let gcs = config.gcs.clone().ok_or_else(|| missing("gcs"))?;
            Arc::new(GcsUploader::new(http()?, gcs, config.upload_path.clone()))
        }
        StorageBackend::S3 => {
            let s3 = config.s3.clone().ok_or_else(|| missing("s3"))?;
            Arc::new(S3CompatibleUploader::new(http()?, s3, config.upload_path.clone()))
        }
        StorageBackend::Local => {
            let local = config.local.clone().ok_or_else(|| missing("local"))?;
            Arc::new(LocalUploader::new(local, config.upload_path.clone()))
        }
    };
    Ok(uploader)
}

/// Turns a non-success HTTP response into a storage error
pub(crate) async fn check_response(response: reqwest::Response, what: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    Err(CampexError::Storage(format!("{what} failed with {status}: {body}")))
}
