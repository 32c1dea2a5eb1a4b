//! REST handlers for the node control-plane.

use crate::core::{Block, Transaction};
use crate::network::{transport, Node};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct BlockCountResponse {
    pub count: usize,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u64,
}

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<String>,
}

#[derive(Deserialize)]
pub struct CreateTransactionRequest {
    pub address: String,
    pub amount: u64,
}

#[derive(Deserialize)]
pub struct AddPeerRequest {
    pub peer: String,
}

#[derive(Serialize)]
pub struct AddPeerResponse {
    pub peer: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

fn error_response(status: StatusCode, e: impl ToString) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /blocks - the full local chain
pub async fn get_blocks(State(node): State<Arc<Node>>) -> Json<Vec<Block>> {
    let chain = node.chain.read().await;
    Json(chain.blocks().to_vec())
}

/// GET /blocks/latest - the chain tip
pub async fn get_latest_block(State(node): State<Arc<Node>>) -> Json<Block> {
    let chain = node.chain.read().await;
    Json(chain.latest_block().clone())
}

/// GET /blockcount
pub async fn get_block_count(State(node): State<Arc<Node>>) -> Json<BlockCountResponse> {
    let chain = node.chain.read().await;
    Json(BlockCountResponse {
        count: chain.blocks().len(),
    })
}

/// POST /mine - mine the next block from the pool contents
pub async fn mine_block(
    State(node): State<Arc<Node>>,
) -> Result<Json<Block>, (StatusCode, Json<ApiError>)> {
    node.mine_block()
        .await
        .map(Json)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
}

/// POST /transactions - create a wallet transaction and gossip the pool
pub async fn create_transaction(
    State(node): State<Arc<Node>>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<Json<Transaction>, (StatusCode, Json<ApiError>)> {
    node.submit_transaction(&request.address, request.amount)
        .await
        .map(Json)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))
}

/// GET /pool - the pending transactions
pub async fn get_pool(State(node): State<Arc<Node>>) -> Json<Vec<Transaction>> {
    let pool = node.pool.read().await;
    Json(pool.snapshot())
}

/// GET /balance - the node wallet's balance
pub async fn get_balance(State(node): State<Arc<Node>>) -> Json<BalanceResponse> {
    Json(BalanceResponse {
        address: node.wallet.address(),
        balance: node.balance().await,
    })
}

/// GET /peers - identities of the registered peers
pub async fn get_peers(State(node): State<Arc<Node>>) -> Json<PeersResponse> {
    Json(PeersResponse {
        peers: node.registry.peer_ids().await,
    })
}

/// POST /peers - dial a peer address and start gossiping with it
pub async fn add_peer(
    State(node): State<Arc<Node>>,
    Json(request): Json<AddPeerRequest>,
) -> Result<Json<AddPeerResponse>, (StatusCode, Json<ApiError>)> {
    node.connect_to_peer(&request.peer)
        .await
        .map(|peer| Json(AddPeerResponse { peer }))
        .map_err(|e| error_response(StatusCode::BAD_GATEWAY, e))
}

/// GET /ws - inbound peer socket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(node): State<Arc<Node>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        log::info!("Inbound peer connection from {}", addr);
        let channels = transport::spawn_inbound(socket);
        node.attach_peer(addr.to_string(), channels).await;
    })
}
