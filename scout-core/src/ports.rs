use crate::error::FetchError;
use crate::model::{ContinuationToken, DeviceRecord, Page};
use async_trait::async_trait;
use std::sync::Arc;

/// One GET per call against `{base}/{resource_path}[?continuation]`.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        resource_path: &str,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Page, FetchError>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for Arc<T> {
    async fn fetch_page(
        &self,
        resource_path: &str,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Page, FetchError> {
        (**self).fetch_page(resource_path, continuation).await
    }
}

// Read side of the device registry contract; writes go through the wallet.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    async fn total(&self) -> anyhow::Result<u64>;
    async fn devices_of(&self, owner: &str) -> anyhow::Result<Vec<DeviceRecord>>;
}
