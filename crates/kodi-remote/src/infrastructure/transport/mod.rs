//! Transport adapters for the Kodi JSON-RPC endpoint.

pub mod auth;
pub mod websocket;

pub use websocket::WebSocketConnector;
