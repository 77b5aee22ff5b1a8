use anyhow::Context;
use clap::Parser;
use pdf_render_service::config::ServiceConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env values must be in place before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    // `init` also routes `log` records from the engine into this subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_render_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::parse();
    let provisioning = config.provisioning().context("invalid browser configuration")?;
    tracing::info!("Browser provisioning: {:?}", provisioning);

    let launcher = pdf_render_service::new_launcher(&provisioning)
        .context("failed to set up browser launcher")?;

    pdf_render_service::server::serve(config, launcher).await
}
