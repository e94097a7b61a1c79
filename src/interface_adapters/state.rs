use crate::use_cases::LobbyRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Directory of live lobbies; every connection routes through it.
    pub lobby_registry: Arc<LobbyRegistry>,
}
