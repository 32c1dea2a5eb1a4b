//! Chain reconciliation and transaction-pool synchronization.
//!
//! [`evaluate`] is the pure decision procedure applied to every RESPONSE_CHAIN:
//! keep the local chain, extend it by the candidate tip, re-query the network,
//! or replace the chain wholesale. The async handlers apply a decision under
//! the chain write lock and gossip the outcome.

use crate::core::{Block, Transaction};
use crate::network::gossip;
use crate::network::message::Message;
use crate::network::node::Node;

/// Outcome of comparing a candidate chain against the local tip
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Candidate is empty or not longer than the local chain
    KeepLocal,
    /// Candidate tip attaches directly to the local tip
    Extend(Block),
    /// A single received block that does not attach: it may belong to a
    /// longer fork we cannot see, so ask every peer for its full chain
    /// instead of guessing
    QueryAll,
    /// A multi-block candidate that does not attach at the tip: treat it as
    /// a full replacement chain, subject to end-to-end validation
    Replace(Vec<Block>),
}

/// Decide what to do with a candidate chain, in precedence order. The local
/// chain wins ties; a longer candidate either extends the tip, triggers a
/// full re-query, or competes as a wholesale replacement.
pub fn evaluate(local_latest: &Block, candidate: &[Block]) -> Reconciliation {
    let tip = match candidate.last() {
        Some(tip) => tip,
        None => return Reconciliation::KeepLocal,
    };

    if tip.index <= local_latest.index {
        return Reconciliation::KeepLocal;
    }
    if tip.previous_hash == local_latest.hash {
        return Reconciliation::Extend(tip.clone());
    }
    if candidate.len() == 1 {
        return Reconciliation::QueryAll;
    }
    Reconciliation::Replace(candidate.to_vec())
}

/// Apply a peer's RESPONSE_CHAIN to the local chain
pub async fn handle_chain_response(node: &Node, candidate: Vec<Block>) {
    let mut chain = node.chain.write().await;

    match evaluate(chain.latest_block(), &candidate) {
        Reconciliation::KeepLocal => {
            log::debug!("Received chain does not beat the local chain");
        }
        Reconciliation::Extend(block) => {
            let index = block.index;
            match chain.add_block(block) {
                Ok(()) => {
                    log::info!("Appended block {} received from peer", index);
                    let unspent = chain.unspent_outputs().to_vec();
                    drop(chain);
                    node.pool.write().await.remove_confirmed(&unspent);
                    gossip::broadcast_latest(node).await;
                }
                Err(e) => log::warn!("Rejected peer block {}: {}", index, e),
            }
        }
        Reconciliation::QueryAll => {
            drop(chain);
            log::info!("Received an unconnected tip, querying peers for full chains");
            gossip::broadcast(&node.registry, &Message::QueryAll).await;
        }
        Reconciliation::Replace(blocks) => match chain.replace_chain(blocks) {
            Ok(()) => {
                let unspent = chain.unspent_outputs().to_vec();
                drop(chain);
                node.pool.write().await.remove_confirmed(&unspent);
                gossip::broadcast_latest(node).await;
            }
            Err(e) => log::warn!("Discarding candidate replacement chain: {}", e),
        },
    }
}

/// Merge a peer's RESPONSE_POOL into the local pool. Each transaction is
/// admitted independently; rejects are logged and never abort the batch. The
/// updated pool is gossiped once if anything was newly added.
pub async fn handle_pool_response(node: &Node, transactions: Vec<Transaction>) {
    if transactions.is_empty() {
        log::warn!("Received an empty transaction pool");
        return;
    }

    let added = {
        let chain = node.chain.read().await;
        let mut pool = node.pool.write().await;
        let mut added = 0usize;
        for tx in transactions {
            let id = tx.id.clone();
            match pool.add(tx, chain.unspent_outputs()) {
                Ok(()) => added += 1,
                Err(e) => log::warn!("Dropping transaction {} from peer pool: {}", id, e),
            }
        }
        added
    };

    if added > 0 {
        log::info!("Added {} transaction(s) from peer pool", added);
        gossip::broadcast_pool(node).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chain::test_support::chain_of_height;
    use crate::core::chain::generate_next_block;
    use crate::core::{Chain, Transaction};
    use crate::mining::Miner;
    use crate::network::registry::PeerHandle;
    use crate::wallet::Wallet;
    use chrono::Utc;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn test_node() -> Arc<Node> {
        Arc::new(Node::new(0))
    }

    /// Register an in-memory peer and return its receive side
    async fn attach_test_peer(node: &Node, id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(16);
        node.registry.register(id.to_string(), PeerHandle::new(tx)).await;
        rx
    }

    /// A chain whose first mined block credits the given wallet
    fn chain_funding_wallet(wallet: &Wallet) -> Chain {
        let mut chain = Chain::with_difficulty(0);
        let block = Miner::new(&wallet.address()).mine_next(chain.latest_block(), Vec::new(), 0);
        chain.add_block(block).unwrap();
        chain
    }

    // ---- evaluate -----------------------------------------------------------

    #[test]
    fn test_empty_candidate_keeps_local() {
        let chain = chain_of_height(1);
        assert_eq!(
            evaluate(chain.latest_block(), &[]),
            Reconciliation::KeepLocal
        );
    }

    #[test]
    fn test_shorter_or_equal_candidate_keeps_local() {
        let local = chain_of_height(2);
        let equal = chain_of_height(2);
        let shorter = chain_of_height(1);

        assert_eq!(
            evaluate(local.latest_block(), equal.blocks()),
            Reconciliation::KeepLocal
        );
        assert_eq!(
            evaluate(local.latest_block(), shorter.blocks()),
            Reconciliation::KeepLocal
        );
    }

    #[test]
    fn test_attaching_tip_extends() {
        let local = chain_of_height(1);
        // Remote holds the same chain, one block longer
        let mut remote = local.clone();
        let coinbase = Transaction::coinbase("miner", 2);
        let next = generate_next_block(remote.latest_block(), vec![coinbase], 0);
        remote.add_block(next.clone()).unwrap();

        assert_eq!(
            evaluate(local.latest_block(), remote.blocks()),
            Reconciliation::Extend(next)
        );
    }

    #[test]
    fn test_single_unconnected_block_queries_all() {
        let local = chain_of_height(1);
        let stray = Block::new(5, "f".repeat(64), Utc::now(), Vec::new(), 0);

        assert_eq!(
            evaluate(local.latest_block(), &[stray]),
            Reconciliation::QueryAll
        );
    }

    #[test]
    fn test_longer_unconnected_chain_replaces() {
        let local = chain_of_height(1);
        let remote = chain_of_height(3);
        // The remote tip does not attach to the local tip
        assert_ne!(remote.latest_block().previous_hash, local.latest_block().hash);

        assert_eq!(
            evaluate(local.latest_block(), remote.blocks()),
            Reconciliation::Replace(remote.blocks().to_vec())
        );
    }

    // ---- handle_chain_response ---------------------------------------------

    #[tokio::test]
    async fn test_extension_appends_and_broadcasts_tip() {
        let node = test_node();
        let mut rx = attach_test_peer(&node, "peer").await;

        // Candidate [B0, B1] where B1 attaches to our genesis tip
        let remote = chain_of_height(1);
        handle_chain_response(&node, remote.blocks().to_vec()).await;

        let chain = node.chain.read().await;
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.blocks(), remote.blocks());
        drop(chain);

        let expected = Message::ResponseChain(vec![remote.latest_block().clone()])
            .encode()
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), expected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_extension_is_rejected_without_broadcast() {
        let node = test_node();
        let mut rx = attach_test_peer(&node, "peer").await;

        let genesis = { node.chain.read().await.latest_block().clone() };
        // Attaches by hash but carries no coinbase, so validation fails
        let bogus = generate_next_block(&genesis, Vec::new(), 0);
        handle_chain_response(&node, vec![genesis, bogus]).await;

        assert_eq!(node.chain.read().await.height(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unconnected_tip_triggers_query_all() {
        let node = test_node();
        {
            let mut chain = node.chain.write().await;
            *chain = chain_of_height(1);
        }
        let mut rx = attach_test_peer(&node, "peer").await;

        let stray = Block::new(2, "f".repeat(64), Utc::now(), Vec::new(), 0);
        handle_chain_response(&node, vec![stray]).await;

        assert_eq!(node.chain.read().await.height(), 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            Message::QueryAll.encode().unwrap()
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_longer_valid_chain_replaces_local() {
        let node = test_node();
        {
            let mut chain = node.chain.write().await;
            *chain = chain_of_height(1);
        }
        let mut rx = attach_test_peer(&node, "peer").await;

        // A disjoint, longer chain built from the same genesis; it does not
        // attach at our tip because its first mined block differs
        let remote = {
            let mut chain = Chain::with_difficulty(0);
            for _ in 0..3 {
                let coinbase = Transaction::coinbase("other-miner", chain.height() + 1);
                let block = generate_next_block(chain.latest_block(), vec![coinbase], 0);
                chain.add_block(block).unwrap();
            }
            chain
        };

        handle_chain_response(&node, remote.blocks().to_vec()).await;

        let chain = node.chain.read().await;
        assert_eq!(chain.height(), 3);
        assert_eq!(chain.blocks(), remote.blocks());
        drop(chain);

        let expected = Message::ResponseChain(vec![remote.latest_block().clone()])
            .encode()
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_invalid_replacement_is_discarded() {
        let node = test_node();
        {
            let mut chain = node.chain.write().await;
            *chain = chain_of_height(1);
        }
        let local_blocks = { node.chain.read().await.blocks().to_vec() };
        let mut rx = attach_test_peer(&node, "peer").await;

        let mut remote = chain_of_height(3).blocks().to_vec();
        remote[2].previous_hash = "e".repeat(64);
        remote[2].hash = remote[2].compute_hash();

        handle_chain_response(&node, remote).await;

        assert_eq!(node.chain.read().await.blocks(), local_blocks);
        assert!(rx.try_recv().is_err());
    }

    // ---- handle_pool_response ----------------------------------------------

    #[tokio::test]
    async fn test_pool_merge_drops_double_spend_and_broadcasts_once() {
        let node = test_node();
        let wallet = Wallet::generate();
        {
            let mut chain = node.chain.write().await;
            *chain = chain_funding_wallet(&wallet);
        }
        let mut rx = attach_test_peer(&node, "peer").await;

        // Two transfers spending the same funding output
        let (valid, conflicting) = {
            let chain = node.chain.read().await;
            let empty = crate::mining::TransactionPool::new();
            let valid = wallet
                .create_transaction("bob", 10, chain.unspent_outputs(), &empty)
                .unwrap();
            let conflicting = wallet
                .create_transaction("carol", 20, chain.unspent_outputs(), &empty)
                .unwrap();
            (valid, conflicting)
        };

        handle_pool_response(&node, vec![valid.clone(), conflicting]).await;

        let pool = node.pool.read().await;
        assert_eq!(pool.snapshot(), vec![valid]);
        drop(pool);

        let frame = rx.recv().await.unwrap();
        assert!(matches!(
            Message::decode(&frame).unwrap(),
            Message::ResponsePool(txs) if txs.len() == 1
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_pool_response_is_a_no_op() {
        let node = test_node();
        let mut rx = attach_test_peer(&node, "peer").await;

        handle_pool_response(&node, Vec::new()).await;

        assert!(node.pool.read().await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_all_rejected_pool_batch_is_not_rebroadcast() {
        let node = test_node();
        let wallet = Wallet::generate();
        let mut rx = attach_test_peer(&node, "peer").await;

        // No funding outputs exist on the default chain, so this is invalid
        let funded = chain_funding_wallet(&wallet);
        let empty = crate::mining::TransactionPool::new();
        let tx = wallet
            .create_transaction("bob", 10, funded.unspent_outputs(), &empty)
            .unwrap();

        handle_pool_response(&node, vec![tx]).await;

        assert!(node.pool.read().await.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
