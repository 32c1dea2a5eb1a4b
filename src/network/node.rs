//! Node state shared by every peer session and the control-plane.

use crate::core::{Block, Chain, ChainError, Transaction};
use crate::mining::{miner, PoolError, TransactionPool};
use crate::network::registry::{PeerError, PeerHandle, PeerId, PeerRegistry};
use crate::network::transport::PeerChannels;
use crate::network::{gossip, session, transport};
use crate::wallet::{Wallet, WalletError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_tungstenite::connect_async;

/// Errors surfaced by node-level operations to the control-plane
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),
}

/// Shared state of a running node. The chain, the transaction pool, and the
/// peer registry are the only mutable state shared across sessions.
pub struct Node {
    pub chain: Arc<RwLock<Chain>>,
    pub pool: Arc<RwLock<TransactionPool>>,
    pub registry: Arc<PeerRegistry>,
    pub wallet: Wallet,
}

impl Node {
    pub fn new(difficulty: u32) -> Self {
        Self {
            chain: Arc::new(RwLock::new(Chain::with_difficulty(difficulty))),
            pool: Arc::new(RwLock::new(TransactionPool::new())),
            registry: Arc::new(PeerRegistry::new()),
            wallet: Wallet::generate(),
        }
    }

    /// Register a connected peer and spawn its session
    pub async fn attach_peer(self: &Arc<Self>, peer_id: PeerId, channels: PeerChannels) {
        self.registry
            .register(peer_id.clone(), PeerHandle::new(channels.outbound.clone()))
            .await;
        tokio::spawn(session::run(self.clone(), peer_id, channels));
    }

    /// Dial a peer address (host:port or a full ws:// url), register it, and
    /// start a session over the new socket
    pub async fn connect_to_peer(self: &Arc<Self>, addr: &str) -> Result<PeerId, PeerError> {
        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("ws://{}/ws", addr)
        };
        log::info!("Connecting to peer {}", url);

        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| PeerError::ConnectionFailed(e.to_string()))?;

        let peer_id: PeerId = addr.to_string();
        let channels = transport::spawn_outbound(socket);
        self.attach_peer(peer_id.clone(), channels).await;
        Ok(peer_id)
    }

    /// Mine the next block from a coinbase plus the current pool contents,
    /// append it, settle the pool, and gossip the new tip.
    pub async fn mine_block(&self) -> Result<Block, NodeError> {
        let (tip, pending, difficulty) = {
            let chain = self.chain.read().await;
            let pool = self.pool.read().await;
            (
                chain.latest_block().clone(),
                pool.snapshot(),
                chain.difficulty(),
            )
        };

        let block = miner::Miner::new(&self.wallet.address()).mine_next(&tip, pending, difficulty);

        {
            let mut chain = self.chain.write().await;
            chain.add_block(block.clone())?;
            let unspent = chain.unspent_outputs().to_vec();
            drop(chain);
            self.pool.write().await.remove_confirmed(&unspent);
        }

        log::info!("Mined block {} ({})", block.index, block.hash);
        gossip::broadcast_latest(self).await;
        Ok(block)
    }

    /// Build a wallet transaction, admit it to the local pool, and gossip the
    /// updated pool
    pub async fn submit_transaction(
        &self,
        to: &str,
        amount: u64,
    ) -> Result<Transaction, NodeError> {
        let tx = {
            let chain = self.chain.read().await;
            let pool = self.pool.read().await;
            self.wallet
                .create_transaction(to, amount, chain.unspent_outputs(), &pool)?
        };

        {
            let chain = self.chain.read().await;
            let mut pool = self.pool.write().await;
            pool.add(tx.clone(), chain.unspent_outputs())?;
        }

        gossip::broadcast_pool(self).await;
        Ok(tx)
    }

    /// Balance of the node wallet against the current unspent-output set
    pub async fn balance(&self) -> u64 {
        let chain = self.chain.read().await;
        self.wallet.balance(chain.unspent_outputs())
    }
}
