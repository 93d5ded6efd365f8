mod mesh_event;
mod mesh_handle;
mod message_bus;
mod orchestrator;
mod room_command;

pub use mesh_event::*;
pub use mesh_handle::*;
pub use message_bus::*;
pub use orchestrator::*;
pub use room_command::*;
