use async_trait::async_trait;
use crate::error::RenderError;
use scraper::{Html, Selector};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub mod http;
pub mod static_page;

pub use http::HttpRenderer;
pub use static_page::StaticRenderer;

/// When a page counts as rendered: `ready_selector` matches at least
/// `min_matches` elements.
#[derive(Debug, Clone)]
pub struct WaitCondition {
    pub ready_selector: String,
    pub min_matches: usize,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Turns a URL into page markup once its dynamic content is in place.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &str;
    async fn render(&self, url: &str, wait: &WaitCondition) -> Result<String, RenderError>;
}

pub fn content_ready(markup: &str, ready_selector: &str, min_matches: usize) -> Result<bool, RenderError> {
    let selector = Selector::parse(ready_selector)
        .map_err(|_| RenderError::Selector(ready_selector.to_string()))?;
    let document = Html::parse_document(markup);
    let wanted = min_matches.max(1);
    let found = document.select(&selector).take(wanted).count();
    Ok(found == wanted)
}

/// Calls `fetch` until the returned markup satisfies `wait`, or the timeout
/// elapses. Fetch errors end the wait immediately.
pub async fn poll_until_ready<F, Fut>(
    url: &str,
    wait: &WaitCondition,
    mut fetch: F,
) -> Result<String, RenderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, RenderError>>,
{
    // Fail fast on a bad selector instead of timing out on it.
    content_ready("", &wait.ready_selector, wait.min_matches)?;

    let poll = async {
        let mut attempt = 1u32;
        loop {
            let markup = fetch().await?;
            if content_ready(&markup, &wait.ready_selector, wait.min_matches)? {
                debug!(url, attempt, "content ready");
                return Ok(markup);
            }
            debug!(url, attempt, selector = %wait.ready_selector, "content not ready yet");
            attempt += 1;
            tokio::time::sleep(wait.poll_interval).await;
        }
    };

    match tokio::time::timeout(wait.timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout {
            url: url.to_string(),
            selector: wait.ready_selector.clone(),
            timeout: wait.timeout,
        }),
    }
}
