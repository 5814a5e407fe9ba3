use axum::serve;
use cmis_gateway::api::create_router;
use cmis_gateway::binding::{default_registry, Binding};
use cmis_gateway::config::AppConfig;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("tower_http", LevelFilter::Warn)
        .init();

    println!("CMIS Gateway: Browser Binding Server");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{} provider={}",
        config.server.host, config.server.port, config.binding.provider
    );

    let registry = default_registry();
    let binding = Arc::new(Binding::new(config.binding_parameters(), &registry)?);
    println!(
        "Gateway opened for repository '{}'",
        config.binding.repository_id
    );

    run_server(create_router(binding), &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("CMIS gateway running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
