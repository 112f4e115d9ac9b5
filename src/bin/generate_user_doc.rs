use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forge_lab::config::Config;
use forge_lab::docs::{self, DocPlan, WORKSTATION_TEMPLATE};
use forge_lab::render::TeraRenderer;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forge_lab=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = Config::load();
    let plan = DocPlan::from_config(&cfg)?;
    tracing::debug!(
        "Documenting {} addresses x {} users from port {}",
        plan.addresses().len(),
        plan.users_per_address(),
        plan.start_port()
    );

    let document = docs::generate_user_doc(&TeraRenderer, WORKSTATION_TEMPLATE, &plan)?;
    println!("{}", document);
    Ok(())
}
