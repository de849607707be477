//! cardiobrain-simulation: Synthetic ECG and EEG recordings
//!
//! Reproducible test signals for the pipelines, benches and the CLI.

pub mod waveforms;
pub mod ecg_simulator;
pub mod eeg_simulator;

pub use waveforms::*;
pub use ecg_simulator::*;
pub use eeg_simulator::*;
