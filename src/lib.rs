//! whatsmyip - answer "ip" chat messages with the host's external address

pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod extract;
pub mod identity;
pub mod messaging;
pub mod runtime;
pub mod subprocess;
pub mod telemetry;
pub mod transport;
