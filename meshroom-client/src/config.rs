use crate::transport::TransportConfig;
use meshroom_core::RoomId;
use meshroom_core::utils::{ANIMAL_NAMES, DEFAULT_RELAY_URL};
use rand::seq::SliceRandom;

/// Everything a client needs to join a room.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    pub room_id: RoomId,
    /// Display name carried in every chat payload.
    pub username: String,
    pub transport: TransportConfig,
    /// Capacity of the relay event and command channels.
    pub channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            room_id: RoomId::default(),
            username: random_username(),
            transport: TransportConfig::default(),
            channel_capacity: 100,
        }
    }
}

pub fn random_username() -> String {
    ANIMAL_NAMES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Guest")
        .to_owned()
}
