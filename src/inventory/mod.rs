use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::Host;
use crate::utils::is_valid_hostname;

const DEFAULT_SSH_PORT: u16 = 22;

/// Supplies the hosts a run operates on
#[async_trait]
pub trait InventoryLoader: Send + Sync {
    async fn load_inventory(&self, source: &str) -> Result<Vec<Host>>;
}

/// Values inherited by hosts that do not set their own
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryDefaults {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Per-host data attributes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostData {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub host_id: Option<u32>,
}

/// Host entry as written in the inventory file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostEntry {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub data: HostData,
}

/// InventoryFile is the on-disk JSON inventory
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryFile {
    #[serde(default)]
    pub defaults: InventoryDefaults,
    pub hosts: BTreeMap<String, HostEntry>,
}

impl InventoryFile {
    /// Resolve entries against the defaults. Hosts come out in name order.
    pub fn into_hosts(self) -> Result<Vec<Host>> {
        let defaults = self.defaults;
        self.hosts
            .into_iter()
            .map(|(name, entry)| {
                let hostname = entry.hostname.filter(|h| !h.is_empty()).unwrap_or_else(|| name.clone());
                if !is_valid_hostname(&name) || !is_valid_hostname(&hostname) {
                    anyhow::bail!("Invalid hostname for host {:?}: {:?}", name, hostname);
                }

                let platform = entry
                    .platform
                    .or_else(|| defaults.platform.clone())
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| anyhow::anyhow!("Host {} has no platform", name))?;

                Ok(Host {
                    hostname,
                    platform,
                    network: entry.data.network,
                    username: entry.username.or_else(|| defaults.username.clone()),
                    password: entry.password.or_else(|| defaults.password.clone()),
                    port: entry.port.or(defaults.port).unwrap_or(DEFAULT_SSH_PORT),
                    host_id: entry.data.host_id,
                    name,
                })
            })
            .collect()
    }
}

/// Reads a JSON inventory file from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonInventory;

#[async_trait]
impl InventoryLoader for JsonInventory {
    async fn load_inventory(&self, source: &str) -> Result<Vec<Host>> {
        let content = tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read inventory {}", source))?;
        let file: InventoryFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse inventory {}", source))?;
        let hosts = file.into_hosts()?;
        tracing::info!("Loaded {} hosts from {}", hosts.len(), source);
        Ok(hosts)
    }
}
