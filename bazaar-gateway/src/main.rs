use std::sync::Arc;

use clap::Parser;

use bazaar_auth::TokenVerifier;
use bazaar_gateway::api::{app, AppState};
use bazaar_gateway::config::GatewayConfig;
use bazaar_gateway::store::{MemoryStore, RestConfig, RestStore, Store};

#[derive(Clone, Debug, Parser)]
pub struct Cli {
    /// Address to listen on
    #[clap(long, short, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Serve from an in-process store instead of the relational backend
    #[clap(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    simple_logger::init_with_level(log::Level::Info)?;

    let cli = Cli::parse();

    let config = GatewayConfig::from_env();
    config
        .validate(!cli.memory)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;

    let store: Arc<dyn Store> = if cli.memory {
        log::warn!("using the in-process store; state will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let base_url = config.store_url.clone().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "store URL required")
        })?;
        let mut rest_config = RestConfig::new(base_url, config.store_service_key.clone());
        rest_config.timeout = config.store_timeout;
        Arc::new(RestStore::new(rest_config))
    };

    let verifier = Arc::new(TokenVerifier::with_leeway(
        config.jwt_secret.as_bytes(),
        config.jwt_leeway,
    ));

    let state = AppState::new(store, verifier);

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    log::info!("bazaar gateway listening on {}", cli.bind);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
