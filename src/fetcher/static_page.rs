use async_trait::async_trait;
use super::{PageRenderer, WaitCondition};
use crate::error::RenderError;
use std::collections::HashMap;

/// Serves fixed markup per URL. Static markup has no dynamic content to wait
/// for, so the wait condition is not consulted; unknown URLs answer 404.
#[derive(Debug, Default, Clone)]
pub struct StaticRenderer {
    pages: HashMap<String, String>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, markup: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), markup.into());
        self
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    fn name(&self) -> &str {
        "static"
    }

    async fn render(&self, url: &str, _wait: &WaitCondition) -> Result<String, RenderError> {
        self.pages.get(url).cloned().ok_or_else(|| RenderError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}
