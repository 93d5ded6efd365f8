pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

pub const DEFAULT_RELAY_URL: &str = "ws://localhost:8080/socket";
pub const DEFAULT_RELAY_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_RELAY_PATH: &str = "/socket";
pub const DEFAULT_ROOM: &str = "room1";

/// Label of the reliable ordered channel the offerer opens toward each peer.
pub const DATA_CHANNEL_LABEL: &str = "chat";

pub const ANIMAL_NAMES: &[&str] = &[
    "Panda", "Tiger", "Lion", "Elephant", "Giraffe", "Penguin", "Dolphin", "Kangaroo", "Koala",
    "Fox", "Wolf", "Bear",
];
