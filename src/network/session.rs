//! Per-connection peer session: handshake, serve loop, close.
//!
//! Each session owns one socket (through its transport channels) for its
//! whole lifetime. On entry it queries the peer's tip and pool; it then
//! serves inbound frames until the peer goes away, and finally removes
//! itself from the registry.

use crate::network::message::Message;
use crate::network::node::Node;
use crate::network::registry::{PeerError, PeerId};
use crate::network::sync;
use crate::network::transport::{Frame, PeerChannels};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Pause between the two handshake queries, so the peer's own startup
/// traffic does not interleave with the pool exchange. Advisory only; the
/// protocol tolerates any ordering.
pub const POOL_QUERY_DELAY: Duration = Duration::from_millis(500);

/// Drive one peer session to completion
pub async fn run(node: Arc<Node>, peer_id: PeerId, channels: PeerChannels) {
    let PeerChannels {
        outbound,
        mut inbound,
    } = channels;

    if handshake(&outbound).await.is_ok() {
        serve(&node, &peer_id, &outbound, &mut inbound).await;
    }

    node.registry.unregister(&peer_id).await;
    log::info!("Session with {} closed", peer_id);
}

/// Ask the new peer for its latest block, and shortly after for its pool
async fn handshake(outbound: &mpsc::Sender<String>) -> Result<(), PeerError> {
    send(outbound, &Message::QueryLatest).await?;
    tokio::time::sleep(POOL_QUERY_DELAY).await;
    send(outbound, &Message::QueryPool).await
}

/// Receive loop: decode each text frame and dispatch it. Undecodable frames
/// are logged and dropped; binary frames are ignored; the loop ends when the
/// peer closes or the socket fails.
async fn serve(
    node: &Node,
    peer_id: &str,
    outbound: &mpsc::Sender<String>,
    inbound: &mut mpsc::Receiver<Frame>,
) {
    while let Some(frame) = inbound.recv().await {
        match frame {
            Frame::Text(text) => match Message::decode(&text) {
                Ok(message) => {
                    log::debug!("Received {} from {}", message.kind(), peer_id);
                    if dispatch(node, outbound, message).await.is_err() {
                        log::warn!("Peer {} is no longer writable", peer_id);
                        break;
                    }
                }
                Err(e) => log::warn!("Dropping frame from {}: {}", peer_id, e),
            },
            Frame::Binary(_) => log::debug!("Ignoring binary frame from {}", peer_id),
        }
    }
}

async fn dispatch(
    node: &Node,
    outbound: &mpsc::Sender<String>,
    message: Message,
) -> Result<(), PeerError> {
    match message {
        Message::QueryLatest => {
            let latest = {
                let chain = node.chain.read().await;
                chain.latest_block().clone()
            };
            send(outbound, &Message::ResponseChain(vec![latest])).await
        }
        Message::QueryAll => {
            let blocks = {
                let chain = node.chain.read().await;
                chain.blocks().to_vec()
            };
            send(outbound, &Message::ResponseChain(blocks)).await
        }
        Message::ResponseChain(blocks) => {
            sync::handle_chain_response(node, blocks).await;
            Ok(())
        }
        Message::QueryPool => {
            let transactions = {
                let pool = node.pool.read().await;
                pool.snapshot()
            };
            send(outbound, &Message::ResponsePool(transactions)).await
        }
        Message::ResponsePool(transactions) => {
            sync::handle_pool_response(node, transactions).await;
            Ok(())
        }
    }
}

async fn send(outbound: &mpsc::Sender<String>, message: &Message) -> Result<(), PeerError> {
    match message.encode() {
        Ok(frame) => outbound
            .send(frame)
            .await
            .map_err(|_| PeerError::Disconnected),
        Err(e) => {
            log::error!("Failed to encode {}: {}", message.kind(), e);
            Ok(())
        }
    }
}
