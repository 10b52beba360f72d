//! Inbound side: dispatch and TCP listener.

mod handler;
mod listener;

pub use handler::{handle_frame, RequestHandler};
pub use listener::{run_server, run_server_on_listener, run_server_on_listener_with_registry};
