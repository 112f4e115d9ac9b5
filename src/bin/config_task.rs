use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forge_lab::config::Config;
use forge_lab::device::{ConfigPusher, SimulatedPusher, SshPusher};
use forge_lab::inventory::{InventoryLoader, JsonInventory};
use forge_lab::render::{PlatformTemplates, TeraRenderer};
use forge_lab::tasks;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing; stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forge_lab=info,config_task=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = Config::load();
    tracing::info!("Inventory: {}", cfg.inventory_path);
    tracing::info!("Push backend: {} (dry_run={})", cfg.push_backend, cfg.dry_run);

    let hosts = JsonInventory.load_inventory(&cfg.inventory_path).await?;
    let templates = PlatformTemplates::load(&cfg.templates_dir).await?;
    tracing::info!("Templates available for: {}", templates.platforms().join(", "));

    let pusher: Arc<dyn ConfigPusher> = match cfg.push_backend.as_str() {
        "ssh" => Arc::new(SshPusher::new(cfg.ssh_timeout_secs)),
        "simulated" => Arc::new(SimulatedPusher::new()),
        other => anyhow::bail!("Unknown PUSH_BACKEND: {} (expected ssh or simulated)", other),
    };

    let results = tasks::run_config_task(
        &hosts,
        &templates,
        &TeraRenderer,
        pusher.as_ref(),
        cfg.dry_run,
    )
    .await;

    print!("{}", tasks::format_results("config_task", &results));

    let failed = results.iter().filter(|r| r.failed()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} hosts failed", failed, results.len());
    }
    Ok(())
}
