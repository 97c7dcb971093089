use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::Arc;

#[derive(Clone)]
pub struct CollectionMetrics {
    pub pages_loaded: IntCounterVec,
    pub items_admitted: IntCounterVec,
    pub items_dropped: IntCounterVec,
    pub fetch_failures: IntCounterVec,
    pub stale_discarded: IntCounterVec,
}

impl CollectionMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Arc<Self>> {
        let labels = &["resource"];
        let pages_loaded = IntCounterVec::new(
            Opts::new("collection_pages_loaded", "Explorer pages applied to a collection"),
            labels,
        )?;
        let items_admitted = IntCounterVec::new(
            Opts::new("collection_items_admitted", "Items that passed validation"),
            labels,
        )?;
        let items_dropped = IntCounterVec::new(
            Opts::new("collection_items_dropped", "Malformed items dropped by validation"),
            labels,
        )?;
        let fetch_failures = IntCounterVec::new(
            Opts::new("collection_fetch_failures", "Page fetches that failed"),
            labels,
        )?;
        let stale_discarded = IntCounterVec::new(
            Opts::new(
                "collection_stale_discarded",
                "Responses discarded because the collection was retargeted",
            ),
            labels,
        )?;
        registry.register(Box::new(pages_loaded.clone())).ok();
        registry.register(Box::new(items_admitted.clone())).ok();
        registry.register(Box::new(items_dropped.clone())).ok();
        registry.register(Box::new(fetch_failures.clone())).ok();
        registry.register(Box::new(stale_discarded.clone())).ok();
        Ok(Arc::new(Self {
            pages_loaded,
            items_admitted,
            items_dropped,
            fetch_failures,
            stale_discarded,
        }))
    }
}
