//! Tinycoin node binary.
//!
//! Runs the HTTP control-plane and the peer WebSocket endpoint on one port.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tinycoin::api::create_router;
use tinycoin::core::DEFAULT_DIFFICULTY;
use tinycoin::network::Node;

#[derive(Parser)]
#[command(name = "tinycoin")]
#[command(version = "0.1.0")]
#[command(about = "A minimal gossip-synchronized blockchain node", long_about = None)]
struct Cli {
    /// Port for the control-plane and the peer WebSocket endpoint
    #[arg(short, long, default_value_t = 3001)]
    port: u16,

    /// Peer address (host:port) to connect to on startup; may be repeated
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Mining difficulty (leading zero bits of a valid block hash)
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();
    let cli = Cli::parse();

    let node = Arc::new(Node::new(cli.difficulty));
    log::info!("Node wallet address: {}", node.wallet.address());

    for peer in &cli.peers {
        if let Err(e) = node.connect_to_peer(peer).await {
            log::warn!("Could not connect to bootstrap peer {}: {}", peer, e);
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on {}", addr);

    axum::serve(
        listener,
        create_router(node).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
