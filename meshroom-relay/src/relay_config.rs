use meshroom_core::utils::{DEFAULT_RELAY_BIND, DEFAULT_RELAY_PATH};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Route the websocket endpoint is mounted at.
    pub path: String,
    /// Also tell a newcomer about every member already in the room. Both
    /// sides then offer and the clients settle the collision themselves.
    pub announce_existing: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_RELAY_BIND.to_owned(),
            path: DEFAULT_RELAY_PATH.to_owned(),
            announce_existing: false,
        }
    }
}
