//! Local directory store for development

use crate::adapters::storage::{object_key, public_url};
use crate::adapters::traits::UploadGateway;
use crate::config::LocalStorageConfig;
use crate::domain::{CampexError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct LocalUploader {
    root_dir: PathBuf,
    public_base: String,
    upload_path: String,
}

impl LocalUploader {
    pub fn new(config: LocalStorageConfig, upload_path: String) -> Self {
        let public_base = config
            .public_base_url
            .unwrap_or_else(|| format!("file://{}", config.root_dir.trim_end_matches('/')));
        Self {
            root_dir: PathBuf::from(config.root_dir),
            public_base,
            upload_path,
        }
    }
}

#[async_trait]
impl UploadGateway for LocalUploader {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        let key = object_key(&self.upload_path, local_path)?;
        let destination = self.root_dir.join(&key);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CampexError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        tokio::fs::copy(local_path, &destination).await.map_err(|e| {
            CampexError::Storage(format!(
                "Failed to copy {} to {}: {e}",
                local_path.display(),
                destination.display()
            ))
        })?;
        Ok(public_url(&self.public_base, &key))
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_upload_copies_file() {
        let work = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        let artifact = work.path().join("campaign_export_42_7_campaign_1234abcd.csv");
        tokio::fs::write(&artifact, "a,b\n1,2\n").await.unwrap();

        let root = store.path().to_string_lossy().to_string();
        let uploader = LocalUploader::new(
            LocalStorageConfig {
                root_dir: root.clone(),
                public_base_url: None,
            },
            "upload/".to_string(),
        );

        let url = uploader.upload(&artifact).await.unwrap();
        assert_eq!(
            url,
            format!("file://{root}/upload/campaign_export_42_7_campaign_1234abcd.csv")
        );
        let copied = store
            .path()
            .join("upload/campaign_export_42_7_campaign_1234abcd.csv");
        assert_eq!(tokio::fs::read_to_string(copied).await.unwrap(), "a,b\n1,2\n");
        assert!(artifact.exists());
    }
}
