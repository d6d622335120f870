//! Proxy to the object store holding listing images.
//!
//! Speaks the Supabase storage REST dialect:
//!
//! - upload: `POST {url}/storage/v1/object/{bucket}/{path}`
//! - remove: `DELETE {url}/storage/v1/object/{bucket}/{path}`
//! - public: `{url}/storage/v1/object/public/{bucket}/{path}`
//!
//! Requests authenticate with the service-role key. When no storage URL or key is
//! configured every operation fails with `StorageError::NotConfigured`.

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::StorageConfig;

const OBJECT_PREFIX: &str = "/storage/v1/object/";
const PUBLIC_MARKER: &str = "/storage/v1/object/public/";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object storage is not configured")]
    NotConfigured,
    #[error("Invalid image URL format")]
    InvalidUrl,
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Clone)]
pub struct StorageService {
    client: reqwest::Client,
    config: StorageConfig,
}

impl StorageService {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint().is_ok()
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Uploads one object and returns its public URL
    pub async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let (base, key) = self.endpoint()?;
        let url = format!("{}{}{}/{}", base, OBJECT_PREFIX, self.config.bucket, path);
        debug!(%url, size = bytes.len(), "uploading object");

        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .header("apikey", key)
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        check(response).await?;

        info!(bucket = %self.config.bucket, %path, "object uploaded");
        Ok(self.public_url(base, path))
    }

    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let (base, key) = self.endpoint()?;
        let url = format!("{}{}{}/{}", base, OBJECT_PREFIX, self.config.bucket, path);

        let response = self
            .client
            .delete(url)
            .bearer_auth(key)
            .header("apikey", key)
            .send()
            .await?;
        check(response).await?;

        info!(bucket = %self.config.bucket, %path, "object deleted");
        Ok(())
    }

    /// Object path inside the bucket for a public URL this store handed out
    pub fn path_from_public_url(&self, public_url: &str) -> Result<String, StorageError> {
        let (_, rest) = public_url.split_once(PUBLIC_MARKER).ok_or(StorageError::InvalidUrl)?;
        let path = rest
            .strip_prefix(&format!("{}/", self.config.bucket))
            .unwrap_or(rest)
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        if path.is_empty() {
            return Err(StorageError::InvalidUrl);
        }
        Ok(path.to_string())
    }

    fn public_url(&self, base: &str, path: &str) -> String {
        format!("{}{}{}/{}", base, PUBLIC_MARKER, self.config.bucket, path)
    }

    fn endpoint(&self) -> Result<(&str, &str), StorageError> {
        let base = self.config.url.as_deref().filter(|u| !u.trim().is_empty());
        let key = self.config.service_key.as_deref().filter(|k| !k.trim().is_empty());
        match (base, key) {
            (Some(base), Some(key)) => Ok((base.trim_end_matches('/'), key)),
            _ => Err(StorageError::NotConfigured),
        }
    }
}

/// `{folder}/{millis}-{hash}.{ext}` where the hash is taken over the content
pub fn object_name(folder: &str, content_type: &str, bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    let ext = content_type.split('/').nth(1).unwrap_or("bin").split(';').next().unwrap_or("bin").trim();
    let name = format!("{}-{}.{}", Utc::now().timestamp_millis(), hash, ext);

    let folder = folder.trim().trim_matches('/');
    if folder.is_empty() {
        name
    } else {
        format!("{}/{}", folder, name)
    }
}

async fn check(response: reqwest::Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> StorageService {
        StorageService::new(StorageConfig {
            url: Some("https://demo.supabase.co/".into()),
            service_key: Some("service-key".into()),
            ..StorageConfig::default()
        })
    }

    #[test]
    fn public_url_round_trips_to_object_path() {
        let storage = configured();
        let url = storage.public_url("https://demo.supabase.co", "listings/abc/1-ff.jpeg");
        assert_eq!(
            url,
            "https://demo.supabase.co/storage/v1/object/public/easylease-storage/listings/abc/1-ff.jpeg"
        );
        assert_eq!(storage.path_from_public_url(&url).unwrap(), "listings/abc/1-ff.jpeg");
        assert!(matches!(
            storage.path_from_public_url("https://elsewhere.com/img.png"),
            Err(StorageError::InvalidUrl)
        ));
    }

    #[test]
    fn object_names_carry_folder_and_extension() {
        let name = object_name("/listings/", "image/png", b"png-bytes");
        assert!(name.starts_with("listings/"));
        assert!(name.ends_with(".png"));
        assert_eq!(object_name("", "image/jpeg", b"x").matches('/').count(), 0);
    }

    #[test]
    fn unconfigured_store_reports_it() {
        let storage = StorageService::new(StorageConfig::default());
        assert!(!storage.is_configured());
        assert!(configured().is_configured());
    }
}
