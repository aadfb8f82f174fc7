pub mod config_manager;
pub mod forwarder;
pub mod sinks;
pub mod source;

pub use forwarder::{Forwarder, ForwarderCounters};
