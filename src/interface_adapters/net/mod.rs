// Network adapter: WebSocket sessions and the per-lobby snapshot serializer.

pub mod client;

pub use client::{spawn_lobby_serializer, ws_handler};
