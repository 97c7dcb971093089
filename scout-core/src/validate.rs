use crate::model::RemoteItem;
use serde_json::Value;

/// Result of running one page through admission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Admission {
    pub items: Vec<RemoteItem>,
    pub dropped: usize,
}

/// Filters a raw page down to admissible items, keeping server order.
pub fn admit(raw: Vec<Value>, identity_fields: &[&str]) -> Admission {
    let total = raw.len();
    let items: Vec<RemoteItem> = raw
        .into_iter()
        .filter_map(|v| RemoteItem::admit(v, identity_fields))
        .collect();
    let dropped = total - items.len();
    Admission { items, dropped }
}

/// Drops nulls, non-objects and objects without an identity; never fails.
pub fn validate(raw: Vec<Value>, identity_fields: &[&str]) -> Vec<RemoteItem> {
    admit(raw, identity_fields).items
}
