//! Peer-to-peer gossip networking.
//!
//! Keeps independently operated nodes eventually consistent on one canonical
//! chain and a shared pool of unconfirmed transactions.
//!
//! # Components
//! - Wire protocol: five JSON message kinds over WebSocket text frames
//! - Peer registry: the shared table of live peer connections
//! - Peer sessions: one state machine per socket
//! - Chain reconciliation: extend, re-query, or replace the local chain
//! - Broadcast fan-out: push state changes to every known peer

pub mod gossip;
pub mod message;
pub mod node;
pub mod registry;
pub mod session;
pub mod sync;
pub mod transport;

pub use message::{Message, ProtocolError};
pub use node::{Node, NodeError};
pub use registry::{PeerError, PeerHandle, PeerId, PeerRegistry};
pub use session::POOL_QUERY_DELAY;
pub use sync::{evaluate, Reconciliation};
pub use transport::{Frame, PeerChannels};
