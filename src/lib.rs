pub mod api;
pub mod binding;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod session;
pub mod spi;

pub use api::{create_router, CallContext};
pub use binding::{default_registry, Binding, ProviderRegistry};
pub use error::{CmisError, ErrorKind};
pub use model::*;
pub use session::Session;

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    // Load configuration
    let config = crate::config::AppConfig::load()?;

    let registry = crate::binding::default_registry();
    let binding = Arc::new(crate::binding::Binding::new(
        config.binding_parameters(),
        &registry,
    )?);

    let app = crate::api::create_router(binding);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}
