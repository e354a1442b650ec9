use minuta_api::setup;
use minuta_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    setup::init_tracing();

    // Load configuration - fail fast on misconfiguration
    let config = Config::from_env()?;

    // Initialize the application (clients, state, routes)
    let (_state, router) = setup::initialize_app(config.clone())?;

    // Start the server
    setup::server::start_server(&config, router).await?;

    Ok(())
}
