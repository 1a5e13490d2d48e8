//! IPC module for daemon to UI shell communication

mod protocol;
mod server;

pub use server::Server;
