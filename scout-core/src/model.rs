use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Explorer endpoints served under `/addresses/{address}/...`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Transactions,
    TokenTransfers,
    Logs,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Transactions,
        ResourceKind::TokenTransfers,
        ResourceKind::Logs,
    ];

    pub fn segment(self) -> &'static str {
        match self {
            ResourceKind::Transactions => "transactions",
            ResourceKind::TokenTransfers => "token-transfers",
            ResourceKind::Logs => "logs",
        }
    }

    /// Fields that identify an item of this kind, in lookup order. Older
    /// Blockscout builds name the transfer hash `tx_hash`, newer ones
    /// `transaction_hash`.
    pub fn identity_fields(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Transactions => &["hash"],
            ResourceKind::TokenTransfers => &["tx_hash", "transaction_hash"],
            ResourceKind::Logs => &["transaction_hash", "tx_hash"],
        }
    }

    pub fn path_for(self, address: &str) -> String {
        format!("addresses/{}/{}", address.trim(), self.segment())
    }

    /// Message shown to a user when a load for this collection failed.
    pub fn failure_message(self) -> &'static str {
        match self {
            ResourceKind::Transactions => {
                "Failed to fetch transactions. Please try again later."
            }
            ResourceKind::TokenTransfers => {
                "Failed to fetch token transfers. Please try again later."
            }
            ResourceKind::Logs => "Failed to fetch contract logs. Please try again later.",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// An explorer record that passed admission.
///
/// The identity is guaranteed present; every other field is whatever the
/// provider sent and must be read defensively.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteItem {
    id: String,
    fields: Map<String, Value>,
}

impl RemoteItem {
    /// Admits `value` when it is a JSON object carrying one of
    /// `identity_fields` with a truthy value (not null, false, 0 or "").
    pub fn admit(value: Value, identity_fields: &[&str]) -> Option<Self> {
        let fields = match value {
            Value::Object(map) => map,
            _ => return None,
        };
        let id = identity_fields
            .iter()
            .find_map(|key| fields.get(*key).and_then(identity_text))?;
        Some(Self { id, fields })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// `item[outer][inner]` as a non-empty string, e.g. `from.hash`.
    pub fn nested_str(&self, outer: &str, inner: &str) -> Option<&str> {
        self.get(outer)
            .and_then(|v| v.get(inner))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Reads a field that providers send either as a JSON number or a
    /// numeric string.
    pub fn u64_field(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
    }

}

fn identity_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        _ => None,
    }
}

/// URL-encoded `next_page_params` from a previous page. Never parsed by the
/// client, only echoed back on the following request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encodes a provider `next_page_params` mapping. Returns `None` for
    /// null, non-object or empty values: none of those offer another page.
    pub fn from_next_page_params(params: &Value) -> Option<Self> {
        let obj = params.as_object()?;
        if obj.is_empty() {
            return None;
        }
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in obj {
            ser.append_pair(key, &query_text(value));
        }
        Some(Self(ser.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn query_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(query_text)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// One parsed explorer page: raw items plus the cursor for the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next: Option<ContinuationToken>,
}

impl Page {
    /// Reads the `{ items, next_page_params }` envelope. A body without an
    /// `items` array is an empty, final page rather than an error.
    pub fn from_envelope(body: &Value) -> Self {
        let items = match body.get("items").and_then(Value::as_array) {
            Some(items) => items.clone(),
            None => return Self::default(),
        };
        let next = body
            .get("next_page_params")
            .and_then(ContinuationToken::from_next_page_params);
        Self { items, next }
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Local view of one paginated collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionState {
    pub target: String,
    pub items: Vec<RemoteItem>,
    pub continuation: Option<ContinuationToken>,
    pub is_loading: bool,
    pub last_error: Option<FetchError>,
}

impl CollectionState {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Whether the provider advertised another page.
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }

    pub fn can_load_more(&self) -> bool {
        self.has_more() && !self.is_loading
    }
}

/// A device record returned by the registry contract's `get(address)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    /// Unix seconds of the last `add`/`ping` for this device.
    pub time: u64,
}
