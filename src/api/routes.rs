//! Control-plane route configuration.

use crate::api::handlers;
use crate::network::Node;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Create the control-plane router. `/ws` doubles as the inbound peer
/// endpoint of the gossip protocol.
pub fn create_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Peer WebSocket endpoint
        .route("/ws", get(handlers::ws_handler))
        // Chain
        .route("/blocks", get(handlers::get_blocks))
        .route("/blocks/latest", get(handlers::get_latest_block))
        .route("/blockcount", get(handlers::get_block_count))
        // Mining and transactions
        .route("/mine", post(handlers::mine_block))
        .route("/transactions", post(handlers::create_transaction))
        .route("/pool", get(handlers::get_pool))
        // Wallet
        .route("/balance", get(handlers::get_balance))
        // Peer management
        .route("/peers", get(handlers::get_peers).post(handlers::add_peer))
        .with_state(node)
        .layer(cors)
}
