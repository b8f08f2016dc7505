//! evalrun command server

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use evalrun_driver::BridgeLauncher;
use evalrun_server::{create_router, install_panic_hook, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    install_panic_hook();

    let addr: SocketAddr = config.bind_addr.parse()?;
    let launcher = BridgeLauncher::from_command_line(&config.bridge)
        .ok_or("EVALRUN_BRIDGE must name a program")?;

    let state = AppState::new(Arc::new(launcher));
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, bridge = %config.bridge, "Command server listening");

    axum::serve(listener, router).await?;
    Ok(())
}
