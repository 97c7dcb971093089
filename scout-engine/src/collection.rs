use parking_lot::Mutex;
use scout_core::{
    validate, CollectionMetrics, CollectionState, FetchError, Page, PageSource, ResourceKind,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a store call did with the collection.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Initial load applied; carries the admitted item count.
    Replaced(usize),
    Appended(usize),
    /// Gate closed: a request was in flight, no page was left, or no target.
    Skipped,
    Failed(FetchError),
    /// Response arrived after the store moved to another target.
    Superseded,
}

#[derive(Clone, Copy)]
enum Apply {
    Replace,
    Append,
}

struct Inner {
    state: CollectionState,
    generation: u64,
}

/// Incrementally loaded explorer collection for one address.
///
/// The lock is only taken to read or apply state, never across a fetch. Each
/// dispatch captures the current generation; `retarget` bumps it, so answers
/// for a previous address are dropped on arrival.
pub struct CollectionStore<S: PageSource> {
    source: S,
    kind: ResourceKind,
    filter: Option<String>,
    inner: Mutex<Inner>,
    metrics: Option<Arc<CollectionMetrics>>,
}

impl<S: PageSource> CollectionStore<S> {
    pub fn new(source: S, kind: ResourceKind, target: impl Into<String>) -> Self {
        Self {
            source,
            kind,
            filter: None,
            inner: Mutex::new(Inner {
                state: CollectionState::new(target),
                generation: 0,
            }),
            metrics: None,
        }
    }

    /// Fixed query sent with every page, e.g. `filter=to`.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = if filter.trim().is_empty() {
            None
        } else {
            Some(filter)
        };
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<CollectionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn snapshot(&self) -> CollectionState {
        self.inner.lock().state.clone()
    }

    pub fn can_load_more(&self) -> bool {
        self.inner.lock().state.can_load_more()
    }

    fn resource_path(&self, target: &str) -> String {
        let path = self.kind.path_for(target);
        match self.filter.as_deref() {
            Some(filter) => format!("{}?{}", path, filter),
            None => path,
        }
    }

    pub async fn load_initial(&self) -> LoadOutcome {
        let (generation, path) = {
            let mut inner = self.inner.lock();
            if inner.state.is_loading || inner.state.target.trim().is_empty() {
                return LoadOutcome::Skipped;
            }
            inner.state.is_loading = true;
            (inner.generation, self.resource_path(&inner.state.target))
        };
        let result = self.source.fetch_page(&path, None).await;
        self.settle(generation, Apply::Replace, result)
    }

    pub async fn load_more(&self) -> LoadOutcome {
        let (generation, path, token) = {
            let mut inner = self.inner.lock();
            if inner.state.is_loading {
                return LoadOutcome::Skipped;
            }
            let Some(token) = inner.state.continuation.clone() else {
                return LoadOutcome::Skipped;
            };
            inner.state.is_loading = true;
            (
                inner.generation,
                self.resource_path(&inner.state.target),
                token,
            )
        };
        let result = self.source.fetch_page(&path, Some(&token)).await;
        self.settle(generation, Apply::Append, result)
    }

    /// Switches to another address: clears items and cursor, then loads the
    /// first page even when a request for the old address is still pending.
    /// The same address behaves like `load_initial`.
    pub async fn retarget(&self, target: &str) -> LoadOutcome {
        let target = target.trim();
        let dispatch = {
            let mut inner = self.inner.lock();
            if inner.state.target == target {
                None
            } else {
                inner.generation += 1;
                inner.state = CollectionState::new(target);
                debug!(target: "collection", resource=%self.kind, address=%target, generation=%inner.generation, "retargeted");
                if target.is_empty() {
                    return LoadOutcome::Skipped;
                }
                inner.state.is_loading = true;
                Some((inner.generation, self.resource_path(target)))
            }
        };
        let Some((generation, path)) = dispatch else {
            return self.load_initial().await;
        };
        let result = self.source.fetch_page(&path, None).await;
        self.settle(generation, Apply::Replace, result)
    }

    fn settle(
        &self,
        generation: u64,
        apply: Apply,
        result: Result<Page, FetchError>,
    ) -> LoadOutcome {
        let label = self.kind.segment();
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            if let Some(m) = self.metrics.as_ref() {
                m.stale_discarded.with_label_values(&[label]).inc();
            }
            debug!(target: "collection", resource=%label, generation=%generation, current=%inner.generation, "stale response discarded");
            return LoadOutcome::Superseded;
        }
        inner.state.is_loading = false;
        match result {
            Ok(page) => {
                let admission = validate::admit(page.items, self.kind.identity_fields());
                let admitted = admission.items.len();
                if let Some(m) = self.metrics.as_ref() {
                    m.pages_loaded.with_label_values(&[label]).inc();
                    m.items_admitted
                        .with_label_values(&[label])
                        .inc_by(admitted as u64);
                    m.items_dropped
                        .with_label_values(&[label])
                        .inc_by(admission.dropped as u64);
                }
                if admission.dropped > 0 {
                    debug!(target: "collection", resource=%label, dropped=%admission.dropped, "malformed items dropped");
                }
                let state = &mut inner.state;
                state.continuation = page.next;
                state.last_error = None;
                let outcome = match apply {
                    Apply::Replace => {
                        state.items = admission.items;
                        LoadOutcome::Replaced(admitted)
                    }
                    Apply::Append => {
                        state.items.extend(admission.items);
                        LoadOutcome::Appended(admitted)
                    }
                };
                debug!(target: "collection", resource=%label, admitted=%admitted, total=%state.items.len(), has_more=%state.has_more(), generation=%generation, "page applied");
                outcome
            }
            Err(err) => {
                if let Some(m) = self.metrics.as_ref() {
                    m.fetch_failures.with_label_values(&[label]).inc();
                }
                warn!(target: "collection", resource=%label, address=%inner.state.target, error=%err, "page load failed");
                inner.state.last_error = Some(err.clone());
                LoadOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prometheus::Registry;
    use scout_core::ContinuationToken;
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::oneshot;

    type Reply = Result<Page, FetchError>;

    enum Scripted {
        Ready(Reply),
        Gated(oneshot::Receiver<Reply>),
    }

    #[derive(Default)]
    struct MockSource {
        calls: Mutex<Vec<(String, Option<String>)>>,
        script: Mutex<HashMap<String, VecDeque<Scripted>>>,
    }

    impl MockSource {
        fn ready(&self, path: &str, reply: Reply) {
            self.script
                .lock()
                .entry(path.to_string())
                .or_default()
                .push_back(Scripted::Ready(reply));
        }

        fn gated(&self, path: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.script
                .lock()
                .entry(path.to_string())
                .or_default()
                .push_back(Scripted::Gated(rx));
            tx
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        async fn wait_for_calls(&self, n: usize) {
            for _ in 0..1_000 {
                if self.call_count() >= n {
                    return;
                }
                tokio::task::yield_now().await;
            }
            panic!("expected {} calls, saw {}", n, self.call_count());
        }
    }

    #[async_trait]
    impl PageSource for MockSource {
        async fn fetch_page(
            &self,
            resource_path: &str,
            continuation: Option<&ContinuationToken>,
        ) -> Result<Page, FetchError> {
            self.calls.lock().push((
                resource_path.to_string(),
                continuation.map(|t| t.as_str().to_string()),
            ));
            let next = self
                .script
                .lock()
                .get_mut(resource_path)
                .and_then(|q| q.pop_front());
            match next {
                Some(Scripted::Ready(reply)) => reply,
                Some(Scripted::Gated(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Transport("gate dropped".into()))),
                None => Ok(Page::default()),
            }
        }
    }

    fn page(hashes: &[&str], next: Option<&str>) -> Reply {
        Ok(Page {
            items: hashes.iter().map(|h| json!({ "hash": h })).collect(),
            next: next.map(ContinuationToken::new),
        })
    }

    fn ids(state: &CollectionState) -> Vec<String> {
        state.items.iter().map(|i| i.id().to_string()).collect()
    }

    const A: &str = "addresses/0xA/transactions";
    const B: &str = "addresses/0xB/transactions";

    fn store(source: &Arc<MockSource>) -> Arc<CollectionStore<Arc<MockSource>>> {
        Arc::new(CollectionStore::new(
            source.clone(),
            ResourceKind::Transactions,
            "0xA",
        ))
    }

    #[tokio::test]
    async fn initial_load_then_load_more_appends_in_order() {
        let source = Arc::new(MockSource::default());
        source.ready(A, page(&["a", "b"], Some("block_number=10")));
        source.ready(A, page(&["b", "c"], None));
        let s = store(&source);

        assert_eq!(s.load_initial().await, LoadOutcome::Replaced(2));
        assert!(s.can_load_more());
        assert_eq!(s.load_more().await, LoadOutcome::Appended(2));

        let snap = s.snapshot();
        assert_eq!(ids(&snap), vec!["a", "b", "b", "c"]);
        assert!(!snap.has_more());
        assert!(!s.can_load_more());
        let calls = source.calls.lock().clone();
        assert_eq!(calls[1].1.as_deref(), Some("block_number=10"));
    }

    #[tokio::test]
    async fn page_without_cursor_offers_no_more() {
        let source = Arc::new(MockSource::default());
        source.ready(A, page(&["a"], None));
        let s = store(&source);

        s.load_initial().await;
        assert!(s.snapshot().continuation.is_none());
        assert_eq!(s.load_more().await, LoadOutcome::Skipped);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn load_more_while_in_flight_issues_one_request() {
        let source = Arc::new(MockSource::default());
        source.ready(A, page(&["a"], Some("index=1")));
        let s = store(&source);
        s.load_initial().await;

        let gate = source.gated(A);
        let pending = {
            let s = s.clone();
            tokio::spawn(async move { s.load_more().await })
        };
        source.wait_for_calls(2).await;
        assert!(s.snapshot().is_loading);
        assert!(!s.can_load_more());
        assert_eq!(s.load_more().await, LoadOutcome::Skipped);
        assert_eq!(s.load_initial().await, LoadOutcome::Skipped);

        gate.send(page(&["b"], None)).expect("send");
        assert_eq!(pending.await.expect("join"), LoadOutcome::Appended(1));
        assert_eq!(source.call_count(), 2);
        assert_eq!(ids(&s.snapshot()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_load_more_keeps_items_and_cursor() {
        let source = Arc::new(MockSource::default());
        source.ready(A, page(&["a"], Some("index=1")));
        source.ready(
            A,
            Err(FetchError::Status {
                status: 500,
                body: "boom".into(),
            }),
        );
        source.ready(A, page(&["b"], None));
        let s = store(&source);

        s.load_initial().await;
        let outcome = s.load_more().await;
        assert!(matches!(outcome, LoadOutcome::Failed(ref e) if e.status() == Some(500)));
        let snap = s.snapshot();
        assert_eq!(ids(&snap), vec!["a"]);
        assert_eq!(snap.continuation.as_ref().map(|t| t.as_str()), Some("index=1"));
        assert!(snap.last_error.is_some());
        assert!(!snap.is_loading);

        assert_eq!(s.load_more().await, LoadOutcome::Appended(1));
        let snap = s.snapshot();
        assert!(snap.last_error.is_none());
        assert_eq!(ids(&snap), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_initial_load_keeps_previous_items() {
        let source = Arc::new(MockSource::default());
        source.ready(A, page(&["a"], None));
        source.ready(A, Err(FetchError::Transport("reset".into())));
        let s = store(&source);

        s.load_initial().await;
        assert!(matches!(s.load_initial().await, LoadOutcome::Failed(_)));
        assert_eq!(ids(&s.snapshot()), vec!["a"]);
    }

    #[tokio::test]
    async fn retarget_discards_late_response_for_previous_address() {
        let source = Arc::new(MockSource::default());
        let gate_a = source.gated(A);
        source.ready(B, page(&["b1"], None));
        let s = store(&source);

        let first = {
            let s = s.clone();
            tokio::spawn(async move { s.load_initial().await })
        };
        source.wait_for_calls(1).await;

        assert_eq!(s.retarget("0xB").await, LoadOutcome::Replaced(1));
        gate_a
            .send(page(&["a1", "a2"], Some("index=9")))
            .expect("send");
        assert_eq!(first.await.expect("join"), LoadOutcome::Superseded);

        let snap = s.snapshot();
        assert_eq!(snap.target, "0xB");
        assert_eq!(ids(&snap), vec!["b1"]);
        assert!(snap.continuation.is_none());
        assert!(!snap.is_loading);
    }

    #[tokio::test]
    async fn late_response_does_not_clear_newer_loading_flag() {
        let source = Arc::new(MockSource::default());
        let gate_a = source.gated(A);
        let gate_b = source.gated(B);
        let s = store(&source);

        let first = {
            let s = s.clone();
            tokio::spawn(async move { s.load_initial().await })
        };
        source.wait_for_calls(1).await;
        let second = {
            let s = s.clone();
            tokio::spawn(async move { s.retarget("0xB").await })
        };
        source.wait_for_calls(2).await;
        assert!(s.snapshot().items.is_empty());

        gate_a.send(page(&["a1"], None)).expect("send");
        assert_eq!(first.await.expect("join"), LoadOutcome::Superseded);
        assert!(s.snapshot().is_loading);
        assert_eq!(s.load_more().await, LoadOutcome::Skipped);

        gate_b.send(page(&["b1"], None)).expect("send");
        assert_eq!(second.await.expect("join"), LoadOutcome::Replaced(1));
        assert_eq!(ids(&s.snapshot()), vec!["b1"]);
    }

    #[tokio::test]
    async fn retarget_to_same_address_is_a_reload() {
        let source = Arc::new(MockSource::default());
        source.ready(A, page(&["a"], None));
        source.ready(A, page(&["a", "z"], None));
        let s = store(&source);

        s.load_initial().await;
        assert_eq!(s.retarget("0xA").await, LoadOutcome::Replaced(2));
        assert_eq!(ids(&s.snapshot()), vec!["a", "z"]);
    }

    #[tokio::test]
    async fn empty_target_never_fetches() {
        let source = Arc::new(MockSource::default());
        let s = CollectionStore::new(source.clone(), ResourceKind::Logs, "");
        assert_eq!(s.load_initial().await, LoadOutcome::Skipped);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn fixed_filter_is_part_of_the_path() {
        let source = Arc::new(MockSource::default());
        source.ready(
            "addresses/0xA/transactions?filter=to",
            page(&["a"], Some("index=2")),
        );
        let s = CollectionStore::new(source.clone(), ResourceKind::Transactions, "0xA")
            .with_filter("filter=to");
        assert_eq!(s.load_initial().await, LoadOutcome::Replaced(1));
        s.load_more().await;
        let calls = source.calls.lock().clone();
        assert_eq!(calls[1].0, "addresses/0xA/transactions?filter=to");
        assert_eq!(calls[1].1.as_deref(), Some("index=2"));
    }

    #[tokio::test]
    async fn malformed_items_are_dropped_and_counted() {
        let source = Arc::new(MockSource::default());
        source.ready(
            A,
            Ok(Page {
                items: vec![json!({"hash": "a"}), Value::Null, json!({}), json!({"hash": "b"})],
                next: None,
            }),
        );
        let registry = Registry::new();
        let metrics = CollectionMetrics::new(&registry).expect("metrics");
        let s = CollectionStore::new(source.clone(), ResourceKind::Transactions, "0xA")
            .with_metrics(metrics.clone());

        assert_eq!(s.load_initial().await, LoadOutcome::Replaced(2));
        assert_eq!(ids(&s.snapshot()), vec!["a", "b"]);
        let label = ["transactions"];
        assert_eq!(metrics.items_dropped.with_label_values(&label).get(), 2);
        assert_eq!(metrics.items_admitted.with_label_values(&label).get(), 2);
        assert_eq!(metrics.pages_loaded.with_label_values(&label).get(), 1);
    }
}
