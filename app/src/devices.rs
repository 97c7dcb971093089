use chrono::{DateTime, Utc};
use scout_core::{relative_time, short_address, DeviceRecord, UNKNOWN};
use serde::Serialize;

/// A registry record together with the owner it was read for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEntry {
    pub owner: String,
    /// Position in the owner's list; the argument `ping` expects.
    pub index: u64,
    pub record: DeviceRecord,
}

impl DeviceEntry {
    pub fn for_owner(owner: &str, records: Vec<DeviceRecord>) -> Vec<Self> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| Self {
                owner: owner.to_string(),
                index: i as u64,
                record,
            })
            .collect()
    }

    pub fn owner_short(&self) -> String {
        short_address(&self.owner)
    }

    /// Time since the last `add`/`ping`, `Unknown` when never set.
    pub fn last_seen(&self, now: DateTime<Utc>) -> String {
        let secs = i64::try_from(self.record.time).unwrap_or(i64::MAX);
        if secs == 0 {
            return UNKNOWN.to_string();
        }
        match DateTime::<Utc>::from_timestamp(secs, 0) {
            Some(ts) => relative_time(&ts.to_rfc3339(), now),
            None => UNKNOWN.to_string(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.record.name.to_lowercase().contains(needle)
            || self.owner.to_lowercase().contains(needle)
    }
}

/// Case-insensitive substring search over device name and owner address.
/// A blank term keeps everything.
pub fn search<'a>(entries: &'a [DeviceEntry], term: &str) -> Vec<&'a DeviceEntry> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return entries.iter().collect();
    }
    entries.iter().filter(|e| e.matches(&needle)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const OWNER: &str = "0x67A71d9d8a6C2A2Ec2C6C0c2Ee5e2a1F5D6Ba5E7";

    fn entries() -> Vec<DeviceEntry> {
        DeviceEntry::for_owner(
            OWNER,
            vec![
                DeviceRecord {
                    name: "Kitchen ESP32".into(),
                    time: 1_700_000_000,
                },
                DeviceRecord {
                    name: "Garage door".into(),
                    time: 0,
                },
            ],
        )
    }

    #[test]
    fn search_is_case_insensitive_on_name_and_owner() {
        let all = entries();
        let hits: Vec<_> = search(&all, "esp32").iter().map(|e| e.index).collect();
        assert_eq!(hits, vec![0]);
        assert_eq!(search(&all, "0x67a71d").len(), 2);
        assert_eq!(search(&all, "  ").len(), 2);
        assert!(search(&all, "thermostat").is_empty());
    }

    #[test]
    fn last_seen_and_owner_card() {
        let all = entries();
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("ts")
            + Duration::minutes(90);
        assert_eq!(all[0].last_seen(now), "1 hour ago");
        assert_eq!(all[1].last_seen(now), UNKNOWN);
        assert_eq!(all[0].owner_short(), "0x67A7...a5E7");
    }
}
