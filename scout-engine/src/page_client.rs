use crate::http_pool::HttpPool;
use async_trait::async_trait;
use scout_core::{ContinuationToken, FetchError, Page, PageSource};
use std::sync::Arc;

/// Blockscout v2 REST client for `{items, next_page_params}` collections.
#[derive(Clone)]
pub struct BlockscoutClient {
    pool: Arc<HttpPool>,
}

impl BlockscoutClient {
    pub fn new(pool: Arc<HttpPool>) -> Self {
        Self { pool }
    }

    /// Appends the token verbatim. A path that already carries a fixed filter
    /// (`...?filter=to`) gets the token after `&`.
    pub fn request_path(resource_path: &str, continuation: Option<&ContinuationToken>) -> String {
        match continuation {
            Some(token) if !token.as_str().is_empty() => {
                let sep = if resource_path.contains('?') { '&' } else { '?' };
                format!("{}{}{}", resource_path, sep, token)
            }
            _ => resource_path.to_string(),
        }
    }
}

#[async_trait]
impl PageSource for BlockscoutClient {
    async fn fetch_page(
        &self,
        resource_path: &str,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Page, FetchError> {
        let resource_path = resource_path.trim();
        if resource_path.is_empty() || resource_path == "/" {
            return Err(FetchError::InvalidRequest(
                "empty resource path".to_string(),
            ));
        }
        let path = Self::request_path(resource_path, continuation);
        let resp = self
            .pool
            .get(&path, None)
            .await
            .map_err(|e| FetchError::Transport(format!("{:#}", e)))?;
        if !resp.is_success() {
            return Err(FetchError::Status {
                status: resp.status,
                body: resp.body_text(),
            });
        }
        let body = resp.json.ok_or_else(|| {
            let text = resp.text.unwrap_or_default();
            let head: String = text.chars().take(120).collect();
            FetchError::Decode(format!("non-json body: {}", head))
        })?;
        let page = Page::from_envelope(&body);
        tracing::debug!(target: "http", path=%resource_path, items=%page.items.len(), last=%page.is_last(), "page fetched");
        Ok(page)
    }
}
