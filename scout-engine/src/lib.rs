pub mod address;
pub mod collection;
pub mod config;
pub mod http_pool;
pub mod page_client;
pub mod registry;

pub use address::*;
pub use collection::*;
pub use config::*;
pub use http_pool::{HttpPool, HttpResponse};
pub use page_client::*;
pub use registry::{add_calldata, ping_calldata, RegistryClient};
