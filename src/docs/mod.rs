//! Workstation assignment documentation.

use anyhow::Result;

use crate::config::Config;
use crate::ipam::parse_ipv4_to_u32;
use crate::models::Workstation;
use crate::ports::{derive_port_pair, last_port};
use crate::render::{Bindings, TemplateRenderer};

/// One block per workstation user
pub const WORKSTATION_TEMPLATE: &str = "Workstation Number: {{ user_number }}

- Router1: {{ ip_address }}:{{ port_1 }}
- Router2: {{ ip_address }}:{{ port_2 }}

More info available at:
{{ info_url }}

";

/// What to document: lab addresses in order, users per address, and the port base.
/// Built through `DocPlan::new`, which keeps every derived port inside the TCP range.
#[derive(Debug, Clone)]
pub struct DocPlan {
    addresses: Vec<String>,
    users_per_address: u16,
    start_port: u16,
    info_url: String,
}

impl DocPlan {
    pub fn new(
        addresses: Vec<String>,
        users_per_address: u32,
        start_port: u32,
        info_url: &str,
    ) -> Result<Self> {
        for address in &addresses {
            parse_ipv4_to_u32(address).map_err(|e| anyhow::anyhow!(e))?;
        }

        last_port(start_port, users_per_address).ok_or_else(|| {
            anyhow::anyhow!(
                "{} users from start port {} run past port {}",
                users_per_address,
                start_port,
                u16::MAX
            )
        })?;

        Ok(Self {
            addresses,
            users_per_address: u16::try_from(users_per_address)?,
            start_port: u16::try_from(start_port)?,
            info_url: info_url.to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.doc_addresses.clone(),
            cfg.users_per_address,
            cfg.start_port,
            &cfg.doc_info_url,
        )
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn users_per_address(&self) -> u16 {
        self.users_per_address
    }

    pub fn start_port(&self) -> u16 {
        self.start_port
    }
}

/// Enumerate workstations: addresses in list order, slots ascending within
/// each address. User numbers run from 1 across the whole plan.
pub fn plan_workstations(plan: &DocPlan) -> Vec<Workstation> {
    let (_, workstations) = plan
        .addresses
        .iter()
        .flat_map(|ip| (0..plan.users_per_address).map(move |slot| (ip, slot)))
        .fold((1u32, Vec::new()), |(user_number, mut acc), (ip, slot)| {
            acc.push(Workstation {
                user_number,
                ip_address: ip.clone(),
                ports: derive_port_pair(plan.start_port, slot),
            });
            (user_number + 1, acc)
        });
    workstations
}

fn workstation_bindings(ws: &Workstation, info_url: &str) -> Bindings {
    let mut bindings = Bindings::new();
    bindings.insert("user_number".into(), ws.user_number.into());
    bindings.insert("ip_address".into(), ws.ip_address.clone().into());
    bindings.insert("port_1".into(), ws.ports.port_1.into());
    bindings.insert("port_2".into(), ws.ports.port_2.into());
    bindings.insert("info_url".into(), info_url.into());
    bindings
}

/// Render one block per workstation and concatenate them in plan order
pub fn generate_user_doc(
    renderer: &dyn TemplateRenderer,
    template: &str,
    plan: &DocPlan,
) -> Result<String> {
    let blocks = plan_workstations(plan)
        .iter()
        .map(|ws| renderer.render(template, &workstation_bindings(ws, &plan.info_url)))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        "Rendered {} workstations across {} addresses",
        blocks.len(),
        plan.addresses.len()
    );
    Ok(blocks.concat())
}
