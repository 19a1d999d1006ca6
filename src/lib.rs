use std::sync::Arc;
use anyhow::{Context, Result};

use crate::config::{Settings, StorageBackend};
use crate::core::{Pipeline, PipelineOptions};
use crate::fetcher::HttpRenderer;
use crate::storage::{GcsAuth, GcsSink, LocalSink, StorageSink};

pub mod config;
pub mod core;
pub mod error;
pub mod fetcher;
pub mod indicators;
pub mod models;
pub mod scrape;
pub mod storage;

/// Wires the HTTP renderer and the configured sink into a pipeline.
pub async fn build_pipeline(settings: &Settings) -> Result<Pipeline> {
    let renderer = HttpRenderer::new(&settings.user_agent).context("building HTTP client")?;

    let sink: Arc<dyn StorageSink> = match settings.backend {
        StorageBackend::Gcs => Arc::new(gcs_sink(settings).await?),
        StorageBackend::Local => Arc::new(LocalSink::new(settings.local_output_dir.clone())),
    };

    let options = PipelineOptions {
        render_timeout: settings.render_timeout,
        poll_interval: settings.poll_interval,
        max_concurrent: settings.max_concurrent,
    };

    Ok(Pipeline::new(Arc::new(renderer), sink, options))
}

/// A static token wins; an emulator endpoint without one goes anonymous;
/// otherwise Application Default Credentials are used.
async fn gcs_sink(settings: &Settings) -> Result<GcsSink> {
    let auth = match (&settings.gcs_access_token, &settings.gcs_base_url) {
        (Some(token), _) => GcsAuth::Static(token.clone()),
        (None, Some(_)) => GcsAuth::Anonymous,
        (None, None) => GcsAuth::application_default()
            .await
            .context("resolving GCS credentials (set GCS_ACCESS_TOKEN or GOOGLE_APPLICATION_CREDENTIALS)")?,
    };

    let mut sink = GcsSink::new(settings.bucket.clone(), auth).context("configuring GCS sink")?;
    if let Some(base_url) = &settings.gcs_base_url {
        sink = sink.with_base_url(base_url);
    }
    Ok(sink)
}
