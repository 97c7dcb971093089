use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use scout_core::{format_native, parse_timestamp, LogRow, PresentContext, RemoteItem};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Contract log emitted on behalf of the device.
    Data,
    Transaction,
}

impl EventType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "data" => Some(Self::Data),
            "transaction" => Some(Self::Transaction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeviceLabel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub event_type: EventType,
    pub timestamp: String,
    pub description: String,
    pub tx_hash: Option<String>,
    pub value: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub method: Option<String>,
}

impl ActivityEvent {
    fn from_transaction(
        index: usize,
        tx: &RemoteItem,
        device: Option<&DeviceLabel>,
        native_symbol: &str,
    ) -> Self {
        let method = tx.str_field("method").map(str::to_string);
        let value = tx.str_field("value").map(str::to_string);
        let description = format!(
            "{} transaction - {}",
            method.as_deref().unwrap_or("Transfer"),
            format_native(value.as_deref().unwrap_or(""), native_symbol)
        );
        Self {
            id: format!("device-tx-{}", index),
            device_id: device
                .map(|d| d.id.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            device_name: device
                .map(|d| d.name.clone())
                .unwrap_or_else(|| "Unknown Device".to_string()),
            event_type: EventType::Transaction,
            timestamp: tx.str_field("timestamp").unwrap_or_default().to_string(),
            description,
            tx_hash: Some(tx.id().to_string()),
            value,
            from: tx.nested_str("from", "hash").map(str::to_string),
            to: tx.nested_str("to", "hash").map(str::to_string),
            method,
        }
    }

    fn from_log(index: usize, log: &RemoteItem, device: Option<&DeviceLabel>) -> Self {
        let row = LogRow::from_item(log, &PresentContext::new("", None));
        let timestamp = log
            .str_field("block_timestamp")
            .or_else(|| log.str_field("timestamp"))
            .unwrap_or_default()
            .to_string();
        Self {
            id: format!("device-log-{}", index),
            device_id: device
                .map(|d| d.id.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            device_name: device
                .map(|d| d.name.clone())
                .unwrap_or_else(|| "Unknown Device".to_string()),
            event_type: EventType::Data,
            timestamp,
            description: format!("{} event - {}", row.method, row.data),
            tx_hash: Some(log.id().to_string()),
            value: None,
            from: log.nested_str("address", "hash").map(str::to_string),
            to: None,
            method: Some(row.method),
        }
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Activity timeline for one device, newest first.
#[derive(Debug, Clone, Default)]
pub struct ActivityFeed {
    events: Vec<ActivityEvent>,
}

impl ActivityFeed {
    /// Transactions become `transaction` events and contract logs `data`
    /// events, merged into one timeline.
    pub fn from_collections(
        txs: &[RemoteItem],
        logs: &[RemoteItem],
        device: Option<&DeviceLabel>,
        native_symbol: &str,
    ) -> Self {
        let tx_events = txs
            .iter()
            .enumerate()
            .map(|(i, tx)| ActivityEvent::from_transaction(i, tx, device, native_symbol));
        let log_events = logs
            .iter()
            .enumerate()
            .map(|(i, log)| ActivityEvent::from_log(i, log, device));
        let mut feed = Self {
            events: tx_events.chain(log_events).collect(),
        };
        feed.sort();
        feed
    }

    // Undated events go last; the sort is stable.
    fn sort(&mut self) {
        self.events.sort_by(|a, b| match (a.time(), b.time()) {
            (Some(ta), Some(tb)) => tb.cmp(&ta),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    pub fn events(&self) -> &[ActivityEvent] {
        &self.events
    }

    /// `None` keeps every event.
    pub fn filter(&self, event_type: Option<EventType>) -> Vec<&ActivityEvent> {
        self.events
            .iter()
            .filter(|e| event_type.map_or(true, |t| e.event_type == t))
            .collect()
    }

    pub fn counts(&self) -> BTreeMap<EventType, usize> {
        let mut out = BTreeMap::new();
        for e in &self.events {
            *out.entry(e.event_type).or_insert(0) += 1;
        }
        out
    }
}
