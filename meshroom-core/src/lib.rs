pub mod model;
pub mod utils;

mod error;

pub use error::ProtocolError;
pub use model::*;
