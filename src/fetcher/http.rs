use async_trait::async_trait;
use super::{poll_until_ready, PageRenderer, WaitCondition};
use crate::error::RenderError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use tracing::info;

/// Renders pages by fetching them over HTTP and re-fetching until the ready
/// selector shows up in the markup.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(user_agent: &str) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pt-BR,pt;q=0.9,en;q=0.8"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, RenderError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| RenderError::Http { url: url.to_string(), source })?;

        if !resp.status().is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|source| RenderError::Http { url: url.to_string(), source })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    fn name(&self) -> &str {
        "http"
    }

    async fn render(&self, url: &str, wait: &WaitCondition) -> Result<String, RenderError> {
        info!(url, selector = %wait.ready_selector, timeout = ?wait.timeout, "rendering page");
        poll_until_ready(url, wait, || self.fetch_once(url)).await
    }
}
