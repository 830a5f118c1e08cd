use sheetchart_api::{setup, telemetry};
use sheetchart_core::AppConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = AppConfig::from_env()?;
    telemetry::init_telemetry()?;

    tracing::info!(
        environment = %config.environment(),
        port = config.server_port(),
        "Configuration loaded"
    );

    let (_state, router) = setup::initialize_app(config.clone()).await?;
    setup::server::start_server(&config, router).await?;

    Ok(())
}
