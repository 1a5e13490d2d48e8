//! Process lifecycle helpers

mod shutdown;

pub use shutdown::{ShutdownSignal, ShutdownReason};
