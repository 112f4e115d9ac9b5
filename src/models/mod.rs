use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical platform values
pub mod platform {
    pub const EOS: &str = "eos";
}

/// Host represents a lab device from the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    /// Address used to reach the device
    pub hostname: String,
    pub platform: String,
    /// Subnet the device's interface address is taken from, in CIDR notation
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<u32>,
}

/// PortPair is the two ports assigned to one workstation user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortPair {
    pub port_1: u16,
    pub port_2: u16,
}

/// Workstation is one entry of the generated user documentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstation {
    pub user_number: u32,
    pub ip_address: String,
    pub ports: PortPair,
}

/// PushResult describes what a configuration push did on a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResult {
    pub changed: bool,
    pub diff: String,
    pub dry_run: bool,
    pub pushed_at: DateTime<Utc>,
}

/// HostResult is the outcome of the configuration task for one host
#[derive(Debug, Clone, Serialize)]
pub struct HostResult {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_config: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostResult {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn changed(&self) -> bool {
        self.push.as_ref().map_or(false, |p| p.changed)
    }
}
