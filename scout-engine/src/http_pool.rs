use crate::config::HttpConfig;
use anyhow::{Context, Result};
use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec, Registry};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, USER_AGENT},
    Client, ClientBuilder,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

#[derive(Clone)]
pub struct HttpPool {
    client: Client,
    base: Url,
    metrics: Arc<HttpMetrics>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub json: Option<Value>,
    pub text: Option<String>,
    pub bytes: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text for error reporting, whichever form was parsed.
    pub fn body_text(&self) -> String {
        if let Some(text) = self.text.as_ref() {
            return text.clone();
        }
        if let Some(js) = self.json.as_ref() {
            return js.to_string();
        }
        String::from_utf8_lossy(&self.bytes).to_string()
    }
}

impl HttpPool {
    pub fn new(cfg: &HttpConfig, registry: &Registry) -> Result<Self> {
        let client = ClientBuilder::new()
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(cfg.max_connections)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            // Bounds connection setup only; slow bodies wait on the transport.
            .connect_timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("build reqwest client")?;
        // Url::join drops the last segment of a base without a trailing slash
        // (".../api/v2" + "addresses" would land on ".../api/addresses").
        let mut base_str = cfg.base_url.trim().to_string();
        if !base_str.ends_with('/') {
            base_str.push('/');
        }
        let base = Url::parse(&base_str).context("parse base url")?;
        let metrics = Arc::new(HttpMetrics::new(registry)?);
        Ok(Self {
            client,
            base,
            metrics,
        })
    }

    pub fn build_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).context("parse absolute url");
        }
        self.base
            .join(path.trim_start_matches('/'))
            .context("join url")
    }

    fn default_headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        h.insert(
            ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate, br"),
        );
        h.insert(USER_AGENT, HeaderValue::from_static("device-scout/0.1"));
        h
    }

    pub async fn get(&self, path: &str, headers: Option<HeaderMap>) -> Result<HttpResponse> {
        let url = self.build_url(path)?;
        let mut h = self.default_headers();
        if let Some(extra) = headers {
            h.extend(extra);
        }
        self.do_req("GET", path, self.client.get(url).headers(h), None)
            .await
    }

    pub async fn post(
        &self,
        path: &str,
        headers: Option<HeaderMap>,
        body: Option<&Value>,
    ) -> Result<HttpResponse> {
        let url = self.build_url(path)?;
        let mut h = self.default_headers();
        if let Some(extra) = headers {
            h.extend(extra);
        }
        self.do_req("POST", path, self.client.post(url).headers(h), body)
            .await
    }

    async fn do_req(
        &self,
        method: &str,
        path: &str,
        builder: reqwest::RequestBuilder,
        body: Option<&Value>,
    ) -> Result<HttpResponse> {
        // Label by route, not by cursor, to keep metric cardinality bounded.
        let label = path.split('?').next().unwrap_or(path);
        let start = Instant::now();
        self.metrics.inflight.with_label_values(&[method]).inc();
        self.metrics
            .req_total
            .with_label_values(&[method, label])
            .inc();
        let sent = match body {
            Some(v) => builder.json(v).send().await,
            None => builder.send().await,
        };
        let resp = match sent {
            Ok(resp) => resp,
            Err(err) => {
                self.metrics.inflight.with_label_values(&[method]).dec();
                self.metrics
                    .fail_total
                    .with_label_values(&[method, label])
                    .inc();
                return Err(err).context("http send");
            }
        };
        let status = resp.status().as_u16();
        let body_bytes = resp.bytes().await;
        let dur = start.elapsed().as_secs_f64();
        self.metrics
            .latency
            .with_label_values(&[method, label])
            .observe(dur);
        self.metrics.inflight.with_label_values(&[method]).dec();
        let body_bytes = body_bytes.context("read body bytes")?;
        if status >= 400 {
            self.metrics
                .fail_total
                .with_label_values(&[method, label])
                .inc();
        }
        let dur_ms = (dur * 1000.0) as u64;
        tracing::info!(target: "http", method=%method, path=%label, status=%status, latency_ms=%dur_ms, bytes=%body_bytes.len(), "HTTP request completed");
        Ok(Self::parse_body(status, &body_bytes))
    }

    // Compressed bodies arrive already decoded by reqwest.
    fn parse_body(status: u16, bytes: &bytes::Bytes) -> HttpResponse {
        let bytes = bytes.to_vec();
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(v) => HttpResponse {
                status,
                json: Some(v),
                text: None,
                bytes,
            },
            Err(_) => HttpResponse {
                status,
                json: None,
                text: Some(String::from_utf8_lossy(&bytes).to_string()),
                bytes,
            },
        }
    }
}

#[derive(Clone)]
struct HttpMetrics {
    req_total: IntCounterVec,
    fail_total: IntCounterVec,
    inflight: IntGaugeVec,
    latency: HistogramVec,
}

impl HttpMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let req_total = IntCounterVec::new(
            prometheus::Opts::new("http_requests_total", "HTTP requests total"),
            &["method", "path"],
        )?;
        let fail_total = IntCounterVec::new(
            prometheus::Opts::new("http_failures_total", "HTTP failures total"),
            &["method", "path"],
        )?;
        let inflight = IntGaugeVec::new(
            prometheus::Opts::new("http_inflight", "HTTP inflight requests"),
            &["method"],
        )?;
        let latency = HistogramVec::new(
            prometheus::HistogramOpts::new("http_latency_seconds", "HTTP request latency seconds")
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(req_total.clone())).ok();
        registry.register(Box::new(fail_total.clone())).ok();
        registry.register(Box::new(inflight.clone())).ok();
        registry.register(Box::new(latency.clone())).ok();
        Ok(Self {
            req_total,
            fail_total,
            inflight,
            latency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(base: &str) -> HttpPool {
        let cfg = HttpConfig {
            base_url: base.to_string(),
            timeout_ms: 1_000,
            max_connections: 1,
        };
        HttpPool::new(&cfg, &Registry::new()).expect("pool")
    }

    #[test]
    fn joins_relative_paths_under_versioned_base() {
        let p = pool("https://explorer.example/api/v2");
        let url = p
            .build_url("addresses/0xabc/logs?block_number=5")
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://explorer.example/api/v2/addresses/0xabc/logs?block_number=5"
        );
        let url = p.build_url("/addresses/0xabc").expect("url");
        assert_eq!(url.as_str(), "https://explorer.example/api/v2/addresses/0xabc");
    }

    #[test]
    fn absolute_urls_bypass_base() {
        let p = pool("https://explorer.example/api/v2/");
        let url = p.build_url("https://rpc.example/").expect("url");
        assert_eq!(url.as_str(), "https://rpc.example/");
    }

    #[test]
    fn parse_body_keeps_non_json_as_text() {
        let resp = HttpPool::parse_body(
            502,
            &bytes::Bytes::from_static(b"<html>bad gateway</html>"),
        );
        assert!(resp.json.is_none());
        assert_eq!(resp.body_text(), "<html>bad gateway</html>");
        assert!(!resp.is_success());
    }

    #[test]
    fn parse_body_decodes_json() {
        let resp = HttpPool::parse_body(200, &bytes::Bytes::from_static(br#"{"items": []}"#));
        assert!(resp.is_success());
        assert!(resp.text.is_none());
        assert_eq!(resp.json, Some(serde_json::json!({"items": []})));
    }

    #[tokio::test]
    async fn slow_response_outlives_connect_timeout() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"items": []}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        let cfg = HttpConfig {
            base_url: server.uri(),
            timeout_ms: 100,
            max_connections: 1,
        };
        let p = HttpPool::new(&cfg, &Registry::new()).expect("pool");
        let resp = p.get("addresses/0xabc/logs", None).await.expect("slow body");
        assert_eq!(resp.status, 200);
        assert!(resp.json.is_some());
    }
}
