//! Bridge-Simulation: ECG/EDA device simulation
//!
//! Stand-ins for the acquisition hardware: a physiologically shaped signal
//! generator for demos and a scripted device for deterministic tests.

pub mod physiology_simulator;
pub mod scripted_device;
pub mod simulated_device;
pub mod waveform;

pub use physiology_simulator::*;
pub use scripted_device::*;
pub use simulated_device::*;
pub use waveform::*;
