//! Socket adapters bridging WebSocket connections to peer sessions.
//!
//! A session only ever sees a pair of channels: an outbound sender of encoded
//! text frames and an inbound receiver of [`Frame`]s. The adapters here pump
//! those channels to and from the two concrete socket types (axum-upgraded
//! inbound sockets and tungstenite outbound sockets), which keeps the session
//! state machine transport-agnostic and directly testable.

use axum::extract::ws::{Message as AxumMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Frames per peer buffered in each direction
const CHANNEL_CAPACITY: usize = 64;

/// An inbound frame as seen by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// The channel pair a session runs over
pub struct PeerChannels {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<Frame>,
}

/// Pump an inbound (axum-upgraded) socket. The reader task ends on close or
/// error, which closes the inbound channel and lets the session wind down.
pub fn spawn_inbound(socket: WebSocket) -> PeerChannels {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (inbound_tx, inbound_rx) = mpsc::channel::<Frame>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(AxumMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            let frame = match message {
                Ok(AxumMessage::Text(text)) => Frame::Text(text.as_str().to_owned()),
                Ok(AxumMessage::Binary(data)) => Frame::Binary(data.to_vec()),
                Ok(AxumMessage::Close(_)) => break,
                // Ping/pong are handled by the websocket stack
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("Inbound socket error: {}", e);
                    break;
                }
            };
            if inbound_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    PeerChannels {
        outbound: outbound_tx,
        inbound: inbound_rx,
    }
}

/// Pump an outbound (dialed) socket
pub fn spawn_outbound(socket: WebSocketStream<MaybeTlsStream<TcpStream>>) -> PeerChannels {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (inbound_tx, inbound_rx) = mpsc::channel::<Frame>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            let frame = match message {
                Ok(WsMessage::Text(text)) => Frame::Text(text.as_str().to_owned()),
                Ok(WsMessage::Binary(data)) => Frame::Binary(data.to_vec()),
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("Outbound socket error: {}", e);
                    break;
                }
            };
            if inbound_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    PeerChannels {
        outbound: outbound_tx,
        inbound: inbound_rx,
    }
}
