//! HTTP control-plane: REST endpoints plus the peer WebSocket upgrade.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
