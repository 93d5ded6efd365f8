pub use meshroom_core::model::{PeerId, RoomId};
pub use meshroom_core::utils;

pub mod model {
    pub use meshroom_core::ProtocolError;
    pub use meshroom_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use meshroom_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use meshroom_relay::*;
}
