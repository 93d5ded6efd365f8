pub mod signaling;

mod relay_config;
mod server;

pub use relay_config::RelayConfig;
pub use server::{router, run, serve};
pub use signaling::RelayService;
