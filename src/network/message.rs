//! Wire messages for the gossip protocol.
//!
//! Every frame is one JSON object `{"type": <0..4>, "data": null | array}`.
//! The decoder enforces the kind/payload pairing: queries carry no data,
//! RESPONSE_CHAIN carries one or more blocks, RESPONSE_POOL carries a list of
//! transactions.

use crate::core::{Block, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decode failures; the offending frame is dropped, the session lives on
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unknown message type {0}")]
    UnknownKind(u64),
    #[error("Payload does not match message type {0}")]
    PayloadMismatch(&'static str),
}

/// A gossip message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Ask a peer for its latest block
    QueryLatest,
    /// Ask a peer for its whole chain
    QueryAll,
    /// A chain fragment: either just the tip or the full chain
    ResponseChain(Vec<Block>),
    /// Ask a peer for its transaction pool
    QueryPool,
    /// A peer's full transaction pool
    ResponsePool(Vec<Transaction>),
}

const QUERY_LATEST: u64 = 0;
const QUERY_ALL: u64 = 1;
const RESPONSE_CHAIN: u64 = 2;
const QUERY_POOL: u64 = 3;
const RESPONSE_POOL: u64 = 4;

/// Outgoing envelope; field order fixes the encoding
#[derive(Serialize)]
struct WireOut<'a> {
    #[serde(rename = "type")]
    kind: u64,
    data: Option<Payload<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Payload<'a> {
    Chain(&'a [Block]),
    Pool(&'a [Transaction]),
}

/// Incoming envelope; the payload is checked against the kind after parsing
#[derive(Deserialize)]
struct WireIn {
    #[serde(rename = "type")]
    kind: u64,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl Message {
    /// Message kind name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Message::QueryLatest => "QueryLatest",
            Message::QueryAll => "QueryAll",
            Message::ResponseChain(_) => "ResponseChain",
            Message::QueryPool => "QueryPool",
            Message::ResponsePool(_) => "ResponsePool",
        }
    }

    /// Serialize to a text frame. Stable: the same logical message always
    /// produces the same string.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let envelope = match self {
            Message::QueryLatest => WireOut {
                kind: QUERY_LATEST,
                data: None,
            },
            Message::QueryAll => WireOut {
                kind: QUERY_ALL,
                data: None,
            },
            Message::ResponseChain(blocks) => WireOut {
                kind: RESPONSE_CHAIN,
                data: Some(Payload::Chain(blocks)),
            },
            Message::QueryPool => WireOut {
                kind: QUERY_POOL,
                data: None,
            },
            Message::ResponsePool(transactions) => WireOut {
                kind: RESPONSE_POOL,
                data: Some(Payload::Pool(transactions)),
            },
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Parse a text frame, rejecting unknown kinds and payload shapes that do
    /// not match the kind's contract.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let envelope: WireIn = serde_json::from_str(frame)?;
        let data = match envelope.data {
            Some(serde_json::Value::Null) | None => None,
            Some(value) => Some(value),
        };

        match envelope.kind {
            QUERY_LATEST => expect_empty(data, "QueryLatest").map(|_| Message::QueryLatest),
            QUERY_ALL => expect_empty(data, "QueryAll").map(|_| Message::QueryAll),
            QUERY_POOL => expect_empty(data, "QueryPool").map(|_| Message::QueryPool),
            RESPONSE_CHAIN => {
                let value = data.ok_or(ProtocolError::PayloadMismatch("ResponseChain"))?;
                let blocks: Vec<Block> = serde_json::from_value(value)
                    .map_err(|_| ProtocolError::PayloadMismatch("ResponseChain"))?;
                if blocks.is_empty() {
                    return Err(ProtocolError::PayloadMismatch("ResponseChain"));
                }
                Ok(Message::ResponseChain(blocks))
            }
            RESPONSE_POOL => {
                let value = data.ok_or(ProtocolError::PayloadMismatch("ResponsePool"))?;
                let transactions: Vec<Transaction> = serde_json::from_value(value)
                    .map_err(|_| ProtocolError::PayloadMismatch("ResponsePool"))?;
                Ok(Message::ResponsePool(transactions))
            }
            kind => Err(ProtocolError::UnknownKind(kind)),
        }
    }
}

fn expect_empty(
    data: Option<serde_json::Value>,
    kind: &'static str,
) -> Result<(), ProtocolError> {
    match data {
        None => Ok(()),
        Some(_) => Err(ProtocolError::PayloadMismatch(kind)),
    }
}
