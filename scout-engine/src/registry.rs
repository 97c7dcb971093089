use crate::config::RpcConfig;
use crate::http_pool::HttpPool;
use alloy_primitives::{hex, Address, U256};
use alloy_sol_types::{sol, SolCall};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use scout_core::{DeviceRecord, RegistryReader};
use std::sync::Arc;

sol! {
    struct Device {
        string name;
        uint256 time;
    }

    function add(string name) external;
    function ping(uint256 index) external;
    function get(address owner) external view returns (Device[] memory);
    function total() external view returns (uint256);
}

/// Calldata for `add(name)`; the wallet signs and submits it.
pub fn add_calldata(name: &str) -> Vec<u8> {
    addCall {
        name: name.to_string(),
    }
    .abi_encode()
}

/// Calldata for `ping(index)`, index into the caller's device list.
pub fn ping_calldata(index: u64) -> Vec<u8> {
    pingCall {
        index: U256::from(index),
    }
    .abi_encode()
}

fn http_rpc_url(rpc_url: &str) -> String {
    if rpc_url.starts_with("wss://") {
        rpc_url.replacen("wss://", "https://", 1)
    } else if rpc_url.starts_with("ws://") {
        rpc_url.replacen("ws://", "http://", 1)
    } else {
        rpc_url.to_string()
    }
}

/// Read-only client for the device registry contract over JSON-RPC `eth_call`.
#[derive(Clone)]
pub struct RegistryClient {
    pool: Arc<HttpPool>,
    rpc_url: String,
    contract: Address,
}

impl RegistryClient {
    pub fn new(pool: Arc<HttpPool>, cfg: &RpcConfig) -> Result<Self> {
        let contract = cfg
            .registry_address
            .trim()
            .parse::<Address>()
            .context("parse registry address")?;
        Ok(Self {
            pool,
            rpc_url: http_rpc_url(cfg.url.trim()),
            contract,
        })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {"to": self.contract.to_string(), "data": hex::encode_prefixed(&data)},
                "latest"
            ]
        });
        let resp = self
            .pool
            .post(&self.rpc_url, None, Some(&body))
            .await
            .context("eth_call send")?;
        if !resp.is_success() {
            bail!("eth_call http {}: {}", resp.status, resp.body_text());
        }
        let js = resp.json.ok_or_else(|| anyhow!("eth_call: non-json body"))?;
        if let Some(err) = js.get("error") {
            bail!("eth_call rpc error: {}", err);
        }
        let result = js
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("eth_call: missing result"))?;
        hex::decode(result.trim_start_matches("0x")).context("eth_call: result hex")
    }
}

#[async_trait]
impl RegistryReader for RegistryClient {
    async fn total(&self) -> Result<u64> {
        let out = self.eth_call(totalCall {}.abi_encode()).await?;
        let ret = totalCall::abi_decode_returns(&out, true).context("decode total()")?;
        let total = u64::try_from(ret._0).map_err(|_| anyhow!("total() exceeds u64"))?;
        tracing::debug!(target: "registry", total=%total, "registry total");
        Ok(total)
    }

    async fn devices_of(&self, owner: &str) -> Result<Vec<DeviceRecord>> {
        let owner = owner
            .trim()
            .parse::<Address>()
            .with_context(|| format!("parse owner address {}", owner))?;
        let out = self.eth_call(getCall { owner }.abi_encode()).await?;
        let ret = getCall::abi_decode_returns(&out, true).context("decode get(address)")?;
        let devices: Vec<DeviceRecord> = ret
            ._0
            .into_iter()
            .map(|d| DeviceRecord {
                name: d.name,
                time: u64::try_from(d.time).unwrap_or(u64::MAX),
            })
            .collect();
        tracing::debug!(target: "registry", owner=%owner, devices=%devices.len(), "registry devices");
        Ok(devices)
    }
}
