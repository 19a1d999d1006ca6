use async_trait::async_trait;
use super::StorageSink;
use crate::error::StorageError;
use gcp_auth::TokenProvider;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

pub const GCS_BASE_URL: &str = "https://storage.googleapis.com";
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/devstorage.read_write"];

/// How uploads authenticate.
#[derive(Clone)]
pub enum GcsAuth {
    /// No `Authorization` header, for local emulators
    Anonymous,
    /// A fixed OAuth bearer token
    Static(String),
    /// Application Default Credentials; tokens are cached and refreshed
    /// by the provider before they expire.
    Provider(Arc<dyn TokenProvider>),
}

impl GcsAuth {
    /// Resolves Application Default Credentials: `GOOGLE_APPLICATION_CREDENTIALS`,
    /// gcloud user credentials, or the metadata server.
    pub async fn application_default() -> Result<Self, StorageError> {
        let provider = gcp_auth::provider().await?;
        Ok(GcsAuth::Provider(provider))
    }

    async fn bearer(&self) -> Result<Option<String>, StorageError> {
        match self {
            GcsAuth::Anonymous => Ok(None),
            GcsAuth::Static(token) => Ok(Some(token.clone())),
            GcsAuth::Provider(provider) => {
                let token = provider.token(SCOPES).await?;
                Ok(Some(token.as_str().to_string()))
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GcsAuth::Anonymous => "anonymous",
            GcsAuth::Static(_) => "static token",
            GcsAuth::Provider(_) => "application default",
        }
    }
}

/// Google Cloud Storage via the JSON API simple (media) upload.
pub struct GcsSink {
    client: Client,
    base_url: String,
    bucket: String,
    auth: GcsAuth,
}

impl GcsSink {
    pub fn new(bucket: String, auth: GcsAuth) -> Result<Self, StorageError> {
        if bucket.trim().is_empty() {
            return Err(StorageError::Config("bucket name is empty".to_string()));
        }

        debug!(bucket = %bucket, auth = auth.kind(), "GCS sink configured");
        Ok(Self {
            client: Client::new(),
            base_url: GCS_BASE_URL.to_string(),
            bucket,
            auth,
        })
    }

    /// Points uploads at another endpoint, e.g. a local GCS emulator.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket)
    }
}

#[async_trait]
impl StorageSink for GcsSink {
    fn name(&self) -> &str {
        "gcs"
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let size = body.len();
        let mut req = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", key)])
            .header(CONTENT_TYPE, content_type)
            .body(body);

        // Fetched per upload so long-running schedules never send an expired token.
        if let Some(token) = self.auth.bearer().await? {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|source| StorageError::Http {
            key: key.to_string(),
            source,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Status { key: key.to_string(), status, body });
        }

        info!(bucket = %self.bucket, key, bytes = size, "uploaded object");
        Ok(())
    }
}
