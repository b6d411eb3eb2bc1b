use vexo_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (models, Drive auth, routes)
    let (_state, router) = vexo_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    vexo_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
