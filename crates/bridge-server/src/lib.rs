//! Bridge-Server: streams ECG/EDA metrics to a local consumer
//!
//! Pulls batches from an acquisition device, decodes and buffers them,
//! estimates heart rate and a stress proxy, and writes one JSON line per
//! batch to a single loopback TCP client.

pub mod client;
pub mod config;
pub mod framing;
pub mod server;
pub mod shutdown;

pub use client::PacketReader;
pub use config::{BridgeConfig, CliArgs, DEFAULT_DEVICE_ADDRESS, DEFAULT_PORT};
pub use framing::{decode_line, encode_line};
pub use server::{BridgeServer, RunSummary, SessionState};
pub use shutdown::spawn_signal_listener;
