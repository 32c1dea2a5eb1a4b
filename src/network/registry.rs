//! Peer registry: the process-wide table of live peer connections.
//!
//! Every session and the broadcast fan-out share one registry. Mutation is
//! linearizable behind an async RwLock; broadcast iterates an owned snapshot,
//! so registrations and removals during a fan-out never corrupt it.

use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

/// Peer identity, derived from the remote network address
pub type PeerId = String;

/// Peer connection errors
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Peer disconnected")]
    Disconnected,
}

/// Handle for sending encoded frames to one peer's writer task
#[derive(Clone)]
pub struct PeerHandle {
    tx: mpsc::Sender<String>,
}

impl PeerHandle {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, frame: String) -> Result<(), PeerError> {
        self.tx.send(frame).await.map_err(|_| PeerError::Disconnected)
    }
}

/// Maps each peer identity to at most one live handle
#[derive(Default)]
pub struct PeerRegistry {
    peers: RwLock<BTreeMap<PeerId, PeerHandle>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the handle for an identity
    pub async fn register(&self, id: PeerId, handle: PeerHandle) {
        let mut peers = self.peers.write().await;
        if peers.insert(id.clone(), handle).is_some() {
            log::info!("Replaced connection for peer {}", id);
        } else {
            log::info!("Registered peer {}", id);
        }
    }

    /// Remove an identity if present; safe to call repeatedly
    pub async fn unregister(&self, id: &str) {
        let mut peers = self.peers.write().await;
        if peers.remove(id).is_some() {
            log::info!("Unregistered peer {}", id);
        }
    }

    /// Point-in-time, identity-ordered copy of the registered peers,
    /// decoupled from the live table
    pub async fn snapshot(&self) -> Vec<(PeerId, PeerHandle)> {
        let peers = self.peers.read().await;
        peers
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect()
    }

    pub async fn peer_ids(&self) -> Vec<PeerId> {
        let peers = self.peers.read().await;
        peers.keys().cloned().collect()
    }

    pub async fn contains(&self, id: &str) -> bool {
        let peers = self.peers.read().await;
        peers.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        let peers = self.peers.read().await;
        peers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn handle() -> (PeerHandle, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        (PeerHandle::new(tx), rx)
    }

    #[tokio::test]
    async fn test_register_then_unregister() {
        let registry = PeerRegistry::new();
        let (h, _rx) = handle();

        registry.register("peer-a".to_string(), h).await;
        assert!(registry.contains("peer-a").await);

        registry.unregister("peer-a").await;
        assert!(!registry.contains("peer-a").await);
        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = PeerRegistry::new();
        registry.unregister("never-registered").await;
        registry.unregister("never-registered").await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_reregistration_overwrites() {
        let registry = PeerRegistry::new();
        let (first, mut first_rx) = handle();
        let (second, mut second_rx) = handle();

        registry.register("peer-a".to_string(), first).await;
        registry.register("peer-a".to_string(), second).await;
        assert_eq!(registry.len().await, 1);

        let snapshot = registry.snapshot().await;
        snapshot[0].1.send("frame".to_string()).await.unwrap();
        assert_eq!(second_rx.recv().await.unwrap(), "frame");
        assert!(first_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered_and_detached() {
        let registry = PeerRegistry::new();
        for id in ["charlie", "alice", "bob"] {
            let (h, _rx) = handle();
            registry.register(id.to_string(), h).await;
        }

        let snapshot = registry.snapshot().await;
        let ids: Vec<&str> = snapshot.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["alice", "bob", "charlie"]);

        // Mutations after the snapshot do not show up in it
        registry.unregister("alice").await;
        assert_eq!(snapshot.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_keep_every_entry() {
        let registry = Arc::new(PeerRegistry::new());

        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (h, _rx) = handle();
                registry.register(format!("peer-{:02}", i), h).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.len().await, 32);
    }
}
