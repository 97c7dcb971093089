//! View-model rows built from admitted explorer items.
//!
//! Every adapter is total: fields the provider left out render as
//! `Unknown`, `0 <unit>` or another explicit fallback.

use crate::format::{
    format_native, format_token_amount, preview, relative_time, short_hash, with_unit, UNKNOWN,
};
use crate::model::RemoteItem;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Builds links into the explorer's web UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerLinks {
    web_base: String,
}

impl ExplorerLinks {
    pub fn new(web_base: &str) -> Self {
        Self {
            web_base: web_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn tx(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.web_base, hash)
    }

    pub fn address(&self, address: &str) -> String {
        format!("{}/address/{}", self.web_base, address)
    }

    pub fn block(&self, block: u64) -> String {
        format!("{}/block/{}", self.web_base, block)
    }

    pub fn token(&self, address: &str) -> String {
        format!("{}/token/{}", self.web_base, address)
    }
}

/// Inputs shared by all adapters for one render pass.
#[derive(Debug, Clone)]
pub struct PresentContext {
    pub now: DateTime<Utc>,
    pub native_symbol: String,
    pub links: Option<ExplorerLinks>,
}

impl PresentContext {
    pub fn new(native_symbol: &str, links: Option<ExplorerLinks>) -> Self {
        Self {
            now: Utc::now(),
            native_symbol: native_symbol.to_string(),
            links,
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn age(&self, timestamp: Option<&str>) -> String {
        match timestamp {
            Some(ts) => relative_time(ts, self.now),
            None => UNKNOWN.to_string(),
        }
    }

    fn tx_link(&self, hash: &str) -> Option<String> {
        self.links.as_ref().map(|l| l.tx(hash))
    }

    fn address_link(&self, address: Option<&str>) -> Option<String> {
        let address = address?;
        self.links.as_ref().map(|l| l.address(address))
    }

    fn block_link(&self, block: Option<u64>) -> Option<String> {
        let block = block?;
        self.links.as_ref().map(|l| l.block(block))
    }
}

fn block_text(block: Option<u64>) -> String {
    block
        .map(|b| b.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn block_of(item: &RemoteItem) -> Option<u64> {
    item.u64_field("block_number").or_else(|| item.u64_field("block"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    pub hash: String,
    pub hash_short: String,
    pub block: String,
    pub age: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub method: String,
    pub gas_used: String,
    pub tx_url: Option<String>,
    pub block_url: Option<String>,
    pub from_url: Option<String>,
    pub to_url: Option<String>,
}

impl TransactionRow {
    pub fn from_item(item: &RemoteItem, ctx: &PresentContext) -> Self {
        let block = block_of(item);
        let from = item.nested_str("from", "hash");
        let to = item.nested_str("to", "hash");
        let gas_used = match item.get("gas_used") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => UNKNOWN.to_string(),
        };
        Self {
            hash: item.id().to_string(),
            hash_short: short_hash(Some(item.id())),
            block: block_text(block),
            age: ctx.age(item.str_field("timestamp")),
            from: short_hash(from),
            to: short_hash(to),
            value: format_native(item.str_field("value").unwrap_or(""), &ctx.native_symbol),
            method: item.str_field("method").unwrap_or("Transfer").to_string(),
            gas_used,
            tx_url: ctx.tx_link(item.id()),
            block_url: ctx.block_link(block),
            from_url: ctx.address_link(from),
            to_url: ctx.address_link(to),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenTransferRow {
    pub hash: String,
    pub hash_short: String,
    pub block: String,
    pub age: String,
    pub from: String,
    pub to: String,
    pub token: String,
    pub amount: String,
    pub tx_url: Option<String>,
    pub token_url: Option<String>,
}

impl TokenTransferRow {
    pub fn from_item(item: &RemoteItem, ctx: &PresentContext) -> Self {
        let block = block_of(item);
        let symbol = item.nested_str("token", "symbol");
        let token_address = item
            .nested_str("token", "address")
            .or_else(|| item.nested_str("token", "address_hash"));
        // Unparseable or absent decimals are treated as a whole-unit token.
        let decimals = item
            .get("token")
            .and_then(|t| t.get("decimals"))
            .and_then(|d| match d {
                Value::String(s) => s.trim().parse::<u32>().ok(),
                Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                _ => None,
            })
            .unwrap_or(0);
        let amount = item
            .nested_str("total", "value")
            .and_then(|raw| format_token_amount(raw, decimals))
            .unwrap_or_else(|| "0".to_string());
        Self {
            hash: item.id().to_string(),
            hash_short: short_hash(Some(item.id())),
            block: block_text(block),
            age: ctx.age(item.str_field("timestamp")),
            from: short_hash(item.nested_str("from", "hash")),
            to: short_hash(item.nested_str("to", "hash")),
            token: symbol.unwrap_or(UNKNOWN).to_string(),
            amount: with_unit(amount, symbol.unwrap_or("")),
            tx_url: ctx.tx_link(item.id()),
            token_url: token_address.and_then(|a| ctx.links.as_ref().map(|l| l.token(a))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    pub tx_hash: String,
    pub block: String,
    pub age: String,
    pub method: String,
    pub topics: Vec<String>,
    pub data: String,
    pub tx_url: Option<String>,
}

impl LogRow {
    pub fn from_item(item: &RemoteItem, ctx: &PresentContext) -> Self {
        let topics: Vec<&str> = item
            .get("topics")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let method = item
            .nested_str("decoded", "method_call")
            .map(|m| m.to_string())
            .or_else(|| topics.first().map(|t| preview(t, 10)))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let data = item
            .str_field("data")
            .map(|d| preview(d, 20))
            .unwrap_or_else(|| "No data".to_string());
        Self {
            tx_hash: short_hash(Some(item.id())),
            block: block_text(block_of(item)),
            age: ctx.age(
                item.str_field("block_timestamp")
                    .or_else(|| item.str_field("timestamp")),
            ),
            method,
            topics: topics.iter().take(2).map(|t| preview(t, 10)).collect(),
            data,
            tx_url: ctx.tx_link(item.id()),
        }
    }
}
