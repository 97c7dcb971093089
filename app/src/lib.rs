pub mod activity;
pub mod config;
pub mod devices;

pub use activity::{ActivityEvent, ActivityFeed, DeviceLabel, EventType};
pub use devices::{search as search_devices, DeviceEntry};
