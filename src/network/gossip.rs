//! Broadcast fan-out: push one message to every registered peer.

use crate::network::message::Message;
use crate::network::node::Node;
use crate::network::registry::PeerRegistry;

/// Encode a message once and send it to every peer in a registry snapshot.
/// Per-peer failures are logged and never stop the fan-out; the failing
/// peer's own session performs the authoritative cleanup when it closes.
pub async fn broadcast(registry: &PeerRegistry, message: &Message) {
    let frame = match message.encode() {
        Ok(frame) => frame,
        Err(e) => {
            log::error!("Failed to encode {} for broadcast: {}", message.kind(), e);
            return;
        }
    };

    let peers = registry.snapshot().await;
    log::debug!("Broadcasting {} to {} peer(s)", message.kind(), peers.len());
    for (id, handle) in peers {
        if let Err(e) = handle.send(frame.clone()).await {
            log::warn!("Broadcast to {} failed: {}", id, e);
        }
    }
}

/// Gossip the local chain tip
pub async fn broadcast_latest(node: &Node) {
    let latest = {
        let chain = node.chain.read().await;
        chain.latest_block().clone()
    };
    broadcast(&node.registry, &Message::ResponseChain(vec![latest])).await;
}

/// Gossip the local transaction pool
pub async fn broadcast_pool(node: &Node) {
    let transactions = {
        let pool = node.pool.read().await;
        pool.snapshot()
    };
    broadcast(&node.registry, &Message::ResponsePool(transactions)).await;
}
