use anyhow::Result;
use std::fmt::Write as _;

use crate::device::ConfigPusher;
use crate::ipam::{derive_interface_address, host_id_for, Ipv4Subnet};
use crate::models::{Host, HostResult};
use crate::render::{Bindings, PlatformTemplates, TemplateRenderer};

/// Derive the host's interface address, render its platform template and
/// push the result. Any failure aborts the task for this host.
pub async fn config_task(
    host: &Host,
    templates: &PlatformTemplates,
    renderer: &dyn TemplateRenderer,
    pusher: &dyn ConfigPusher,
    dry_run: bool,
) -> Result<HostResult> {
    let subnet: Ipv4Subnet = host
        .network
        .parse()
        .map_err(|e| anyhow::anyhow!("Host {} network {:?}: {}", host.name, host.network, e))?;
    let interface_ip = derive_interface_address(&subnet, host_id_for(host))?;
    tracing::debug!("{}: interface address {}", host.name, interface_ip);

    let template = templates.get(&host.platform).ok_or_else(|| {
        anyhow::anyhow!("No template for platform {} (host {})", host.platform, host.name)
    })?;

    let mut bindings = Bindings::new();
    bindings.insert("ip_address".into(), interface_ip.to_string().into());
    let rendered = renderer.render(template, &bindings)?;

    let push = pusher.push(host, &rendered, dry_run).await?;

    Ok(HostResult {
        host: host.name.clone(),
        interface_ip: Some(interface_ip.to_string()),
        rendered_config: Some(rendered),
        push: Some(push),
        error: None,
    })
}

/// Run the config task over every host in order. A failing host is
/// recorded and logged; the remaining hosts still run.
pub async fn run_config_task(
    hosts: &[Host],
    templates: &PlatformTemplates,
    renderer: &dyn TemplateRenderer,
    pusher: &dyn ConfigPusher,
    dry_run: bool,
) -> Vec<HostResult> {
    let mut results = Vec::with_capacity(hosts.len());

    for host in hosts {
        match config_task(host, templates, renderer, pusher, dry_run).await {
            Ok(result) => {
                tracing::info!("{}: done (changed={})", host.name, result.changed());
                results.push(result);
            }
            Err(e) => {
                tracing::error!("{}: config task failed: {:#}", host.name, e);
                results.push(HostResult {
                    host: host.name.clone(),
                    interface_ip: None,
                    rendered_config: None,
                    push: None,
                    error: Some(format!("{:#}", e)),
                });
            }
        }
    }

    results
}

/// Plain-text report of a run, one section per host
pub fn format_results(task_name: &str, results: &[HostResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", task_name, "*".repeat(60usize.saturating_sub(task_name.len())));

    for result in results {
        let _ = writeln!(
            out,
            "* {} ** changed : {} ** failed : {}",
            result.host,
            result.changed(),
            result.failed()
        );

        if let Some(ref ip) = result.interface_ip {
            let _ = writeln!(out, "---- interface address ----\n{}", ip);
        }
        if let Some(ref config) = result.rendered_config {
            let _ = writeln!(out, "---- rendered config ----\n{}", config);
        }
        if let Some(ref push) = result.push {
            let mode = if push.dry_run { "dry run" } else { "applied" };
            let _ = writeln!(out, "---- push ({}) ----", mode);
            if push.diff.is_empty() {
                let _ = writeln!(out, "(no changes)");
            } else {
                let _ = writeln!(out, "{}", push.diff);
            }
        }
        if let Some(ref error) = result.error {
            let _ = writeln!(out, "---- error ----\n{}", error);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedPusher;
    use crate::render::TeraRenderer;

    fn host(name: &str, network: &str, platform: &str) -> Host {
        Host {
            name: name.to_string(),
            hostname: name.to_string(),
            platform: platform.to_string(),
            network: network.to_string(),
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            port: 22,
            host_id: None,
        }
    }

    #[tokio::test]
    async fn test_config_task_router1_takes_first_address() {
        let pusher = SimulatedPusher::new();
        let result = config_task(
            &host("router1", "10.0.0.0/24", "eos"),
            &PlatformTemplates::builtin(),
            &TeraRenderer,
            &pusher,
            false,
        )
        .await
        .unwrap();

        assert_eq!(result.interface_ip.as_deref(), Some("10.0.0.0/24"));
        assert_eq!(
            result.rendered_config.as_deref(),
            Some("interface Ethernet1\nno switchport\nip address 10.0.0.0/24\nno shutdown")
        );
        assert!(result.changed());
        assert!(pusher
            .running_config("router1")
            .await
            .unwrap()
            .contains("ip address 10.0.0.0/24"));
    }

    #[tokio::test]
    async fn test_config_task_other_hosts_take_second_address() {
        let pusher = SimulatedPusher::new();
        let result = config_task(
            &host("router2", "10.0.0.0/24", "eos"),
            &PlatformTemplates::builtin(),
            &TeraRenderer,
            &pusher,
            true,
        )
        .await
        .unwrap();

        assert_eq!(result.interface_ip.as_deref(), Some("10.0.0.1/24"));
        assert!(result.push.unwrap().dry_run);
        assert_eq!(pusher.running_config("router2").await, None);
    }

    #[tokio::test]
    async fn test_config_task_unsupported_host_id() {
        let mut h = host("router3", "10.0.0.0/24", "eos");
        h.host_id = Some(3);
        let err = config_task(&h, &PlatformTemplates::builtin(), &TeraRenderer, &SimulatedPusher::new(), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported host ID 3"));
    }

    #[tokio::test]
    async fn test_config_task_unknown_platform() {
        let err = config_task(
            &host("router1", "10.0.0.0/24", "junos"),
            &PlatformTemplates::builtin(),
            &TeraRenderer,
            &SimulatedPusher::new(),
            false,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("No template for platform junos"));
    }

    #[tokio::test]
    async fn test_run_continues_past_failing_host() {
        let hosts = vec![
            host("router1", "10.0.0.0/24", "eos"),
            host("broken", "10.0.0.1/24", "eos"),
            host("router2", "10.0.0.0/24", "eos"),
        ];
        let results = run_config_task(
            &hosts,
            &PlatformTemplates::builtin(),
            &TeraRenderer,
            &SimulatedPusher::new(),
            false,
        )
        .await;

        assert_eq!(results.len(), 3);
        assert!(!results[0].failed());
        assert!(results[1].failed());
        assert!(results[1].error.as_ref().unwrap().contains("Invalid CIDR"));
        assert!(!results[2].failed());
        assert_eq!(results[2].interface_ip.as_deref(), Some("10.0.0.1/24"));
    }

    #[tokio::test]
    async fn test_format_results() {
        let hosts = vec![host("router1", "10.0.0.0/24", "eos"), host("bad", "10.0.0.0/24", "ios")];
        let results = run_config_task(
            &hosts,
            &PlatformTemplates::builtin(),
            &TeraRenderer,
            &SimulatedPusher::new(),
            false,
        )
        .await;

        let report = format_results("config_task", &results);
        assert!(report.starts_with("config_task ****"));
        assert!(report.contains("* router1 ** changed : true ** failed : false"));
        assert!(report.contains("+ip address 10.0.0.0/24"));
        assert!(report.contains("* bad ** changed : false ** failed : true"));
        assert!(report.contains("No template for platform ios"));
    }
}
