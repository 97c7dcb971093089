use crate::http_pool::HttpPool;
use anyhow::{anyhow, Context, Result};
use scout_core::format_native;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Explorer overview of a single address (`GET /addresses/{a}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressSummary {
    pub address: String,
    pub name: Option<String>,
    pub is_contract: bool,
    pub is_verified: bool,
    /// Raw base-unit balance as sent by the explorer, `"0"` when absent.
    pub coin_balance: String,
    pub balance_display: String,
    pub creation_tx_hash: Option<String>,
    pub implementation_address: Option<String>,
    pub compiler_version: Option<String>,
}

fn opt_str(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl AddressSummary {
    pub fn from_json(address: &str, body: &Value, native_symbol: &str) -> Self {
        let coin_balance = match body.get("coin_balance") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "0".to_string(),
        };
        // Newer explorer builds list proxies under `implementations`.
        let implementation_address = opt_str(body, "implementation_address").or_else(|| {
            body.get("implementations")
                .and_then(Value::as_array)
                .and_then(|list| list.first())
                .and_then(|first| first.get("address"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        Self {
            address: opt_str(body, "hash").unwrap_or_else(|| address.to_string()),
            name: opt_str(body, "name"),
            is_contract: body
                .get("is_contract")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            is_verified: body
                .get("is_verified")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            balance_display: format_native(&coin_balance, native_symbol),
            coin_balance,
            creation_tx_hash: opt_str(body, "creation_tx_hash")
                .or_else(|| opt_str(body, "creation_transaction_hash")),
            implementation_address,
            compiler_version: opt_str(body, "compiler_version"),
        }
    }
}

#[derive(Clone)]
pub struct AddressClient {
    pool: Arc<HttpPool>,
    native_symbol: String,
}

impl AddressClient {
    pub fn new(pool: Arc<HttpPool>, native_symbol: impl Into<String>) -> Self {
        Self {
            pool,
            native_symbol: native_symbol.into(),
        }
    }

    pub async fn fetch(&self, address: &str) -> Result<AddressSummary> {
        let address = address.trim();
        if address.is_empty() {
            return Err(anyhow!("empty address"));
        }
        let resp = self
            .pool
            .get(&format!("addresses/{}", address), None)
            .await
            .context("fetch address summary")?;
        if !resp.is_success() {
            return Err(anyhow!(
                "address summary http {}: {}",
                resp.status,
                resp.body_text()
            ));
        }
        let body = resp
            .json
            .ok_or_else(|| anyhow!("address summary: non-json body"))?;
        Ok(AddressSummary::from_json(address, &body, &self.native_symbol))
    }
}
