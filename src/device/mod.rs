use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::Mutex;

use crate::models::{platform, Host, PushResult};

/// Pushes rendered configuration to a device
#[async_trait]
pub trait ConfigPusher: Send + Sync {
    /// Apply `config` to `host`, or only compute the diff when `dry_run` is set
    async fn push(&self, host: &Host, config: &str, dry_run: bool) -> Result<PushResult>;
}

/// Build the CLI payload that stages `config` in a named EOS configure
/// session, prints the session diff and then commits or aborts it.
pub fn eos_session_payload(session: &str, config: &str, dry_run: bool) -> String {
    let mut lines = vec![format!("configure session {}", session)];
    lines.extend(
        config
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            // "end" would leave the session before the diff is shown
            .filter(|line| !line.trim().eq_ignore_ascii_case("end"))
            .map(str::to_string),
    );
    lines.push("show session-config diffs".to_string());
    lines.push(if dry_run { "abort" } else { "commit" }.to_string());
    lines.join("\n")
}

fn diff_line_regex() -> &'static Regex {
    static DIFF_LINE: OnceLock<Regex> = OnceLock::new();
    DIFF_LINE.get_or_init(|| Regex::new(r"^[+-](?:[^+-]|$)").expect("diff line pattern is valid"))
}

/// Pull the +/- lines out of device output, skipping unified diff headers
pub fn extract_diff(output: &str) -> String {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| diff_line_regex().is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// CLI error lines in device output, e.g. `% Invalid input (at token 1: 'ip')`
pub fn device_errors(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('%') || line.contains("Invalid input"))
        .map(str::to_string)
        .collect()
}

/// Diff reported by a session run, or an error when the device rejected any line
pub fn check_session_output(host: &str, output: &str) -> Result<String> {
    let errors = device_errors(output);
    if !errors.is_empty() {
        return Err(anyhow::anyhow!(
            "Device {} rejected config: {}",
            host,
            errors.join("; ")
        ));
    }
    Ok(extract_diff(output))
}

/// Pushes over SSH using the device's own configuration session mechanism.
/// Every push first stages the config in a session that is aborted; only a
/// clean staging run is followed by the committing run.
#[derive(Debug, Clone)]
pub struct SshPusher {
    timeout_secs: u64,
}

impl SshPusher {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    fn payload_for(host: &Host, config: &str, dry_run: bool) -> Result<String> {
        match host.platform.as_str() {
            platform::EOS => {
                let session = format!("forge_lab_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
                Ok(eos_session_payload(&session, config, dry_run))
            }
            other => Err(anyhow::anyhow!(
                "Unsupported platform for push on {}: {}",
                host.name,
                other
            )),
        }
    }

    async fn run_session(&self, host: &Host, user: &str, pass: &str, payload: &str) -> Result<String> {
        let output = crate::utils::ssh_run_interactive_async(
            &host.hostname,
            host.port,
            user,
            pass,
            payload,
            self.timeout_secs,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Push to {} failed: {}", host.name, e))?;

        check_session_output(&host.name, &output)
    }
}

#[async_trait]
impl ConfigPusher for SshPusher {
    async fn push(&self, host: &Host, config: &str, dry_run: bool) -> Result<PushResult> {
        let staging = Self::payload_for(host, config, true)?;

        let user = host.username.clone().filter(|s| !s.is_empty());
        let pass = host.password.clone().filter(|s| !s.is_empty());
        let (Some(user), Some(pass)) = (user, pass) else {
            return Err(anyhow::anyhow!("No SSH credentials available for {}", host.name));
        };

        tracing::info!(
            "Pushing config to {} ({}:{}) as {} (dry_run={})",
            host.name,
            host.hostname,
            host.port,
            user,
            dry_run
        );

        let mut diff = self.run_session(host, &user, &pass, &staging).await?;

        if !dry_run && !diff.is_empty() {
            let commit = Self::payload_for(host, config, false)?;
            diff = self.run_session(host, &user, &pass, &commit).await?;
        }

        Ok(PushResult {
            changed: !diff.is_empty(),
            diff,
            dry_run,
            pushed_at: Utc::now(),
        })
    }
}

/// In-memory lab devices. Pushes merge lines into each device's running config.
#[derive(Debug, Default)]
pub struct SimulatedPusher {
    running: Mutex<HashMap<String, Vec<String>>>,
}

impl SimulatedPusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a device's running config
    pub async fn set_running_config(&self, host: &str, config: &str) {
        let lines = config_lines(config).map(str::to_string).collect();
        self.running.lock().await.insert(host.to_string(), lines);
    }

    pub async fn running_config(&self, host: &str) -> Option<String> {
        self.running.lock().await.get(host).map(|lines| lines.join("\n"))
    }
}

fn config_lines(config: &str) -> impl Iterator<Item = &str> {
    config.lines().map(str::trim_end).filter(|line| !line.trim().is_empty())
}

#[async_trait]
impl ConfigPusher for SimulatedPusher {
    async fn push(&self, host: &Host, config: &str, dry_run: bool) -> Result<PushResult> {
        let mut running = self.running.lock().await;
        let existing = running.get(&host.name).cloned().unwrap_or_default();

        let added: Vec<String> = config_lines(config)
            .filter(|line| !existing.iter().any(|current| current == line))
            .map(str::to_string)
            .collect();

        let diff = added
            .iter()
            .map(|line| format!("+{}", line))
            .collect::<Vec<_>>()
            .join("\n");

        if !dry_run {
            running
                .entry(host.name.clone())
                .or_default()
                .extend(added.iter().cloned());
        }

        tracing::debug!(
            "Simulated push to {}: {} new lines (dry_run={})",
            host.name,
            added.len(),
            dry_run
        );

        Ok(PushResult {
            changed: !added.is_empty(),
            diff,
            dry_run,
            pushed_at: Utc::now(),
        })
    }
}
