use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://blockscout-passet-hub.parity-testnet.parity.io/api/v2";
pub const DEFAULT_REGISTRY_ADDRESS: &str = "0x83aC19d72648a87a7ecB6D2913C0B1B7e04b5a31";

fn default_explorer_web_url() -> String {
    "https://blockscout-passet-hub.parity-testnet.parity.io".to_string()
}

fn default_native_symbol() -> String {
    "PAS".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub registry_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub http: HttpConfig,
    pub rpc: RpcConfig,
    #[serde(default = "default_explorer_web_url")]
    pub explorer_web_url: String,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                base_url: DEFAULT_API_BASE.to_string(),
                timeout_ms: 15_000,
                max_connections: 8,
            },
            rpc: RpcConfig {
                url: "https://paseo-assethub.polkadot.io".to_string(),
                registry_address: DEFAULT_REGISTRY_ADDRESS.to_string(),
            },
            explorer_web_url: default_explorer_web_url(),
            native_symbol: default_native_symbol(),
        }
    }
}
