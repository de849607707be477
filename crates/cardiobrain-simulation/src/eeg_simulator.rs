//! Multichannel EEG simulator: one dominant rhythm per channel plus Gaussian noise

use crate::waveforms::Rhythm;
use cardiobrain_core::{CbError, CbResult, Modality, Signal, SignalMetadata};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Configuration for EEG simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EegSimConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Number of channels to simulate
    pub channel_count: usize,
    /// Dominant rhythm of each channel, reused cyclically past the end
    pub rhythms: Vec<Rhythm>,
    /// Gaussian noise standard deviation
    pub noise_std: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for EegSimConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 250.0,
            channel_count: 4,
            rhythms: [10.0, 12.0, 8.0, 15.0].iter().map(|&f| Rhythm::new(f, 1.0)).collect(),
            noise_std: 0.5,
            seed: None,
        }
    }
}

/// EEG signal simulator
pub struct EegSimulator {
    config: EegSimConfig,
    rng: StdRng,
    noise: Normal<f64>,
}

impl EegSimulator {
    pub fn new(config: EegSimConfig) -> CbResult<Self> {
        SignalMetadata::validate_sampling_rate(config.sampling_rate)?;
        if config.channel_count == 0 || config.rhythms.is_empty() {
            return Err(CbError::config("EEG simulation needs at least one channel and one rhythm"));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        if !(config.noise_std.is_finite() && config.noise_std >= 0.0) {
            return Err(CbError::config(format!("Invalid EEG noise level: {}", config.noise_std)));
        }
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| CbError::config(format!("Invalid EEG noise level: {}", e)))?;

        Ok(Self { config, rng, noise })
    }

    /// Generate `duration` seconds of every channel
    pub fn generate(&mut self, duration: f64) -> CbResult<Vec<Signal>> {
        (0..self.config.channel_count)
            .map(|channel| self.generate_channel(channel, duration))
            .collect()
    }

    /// Generate `duration` seconds of a single channel
    pub fn generate_channel(&mut self, channel: usize, duration: f64) -> CbResult<Signal> {
        let fs = self.config.sampling_rate;
        let n = (duration * fs).round() as usize;
        let rhythm = self.config.rhythms[channel % self.config.rhythms.len()];

        let data: Vec<f64> = (0..n)
            .map(|i| rhythm.value_at(i as f64 / fs) + self.noise.sample(&mut self.rng))
            .collect();

        Signal::new(data, fs, Modality::Eeg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channels() {
        let mut simulator = EegSimulator::new(EegSimConfig { seed: Some(3), ..Default::default() }).unwrap();
        let channels = simulator.generate(2.0).unwrap();

        assert_eq!(channels.len(), 4);
        for channel in &channels {
            assert_eq!(channel.len(), 500);
            assert_eq!(channel.sampling_rate(), 250.0);
            assert_eq!(channel.modality(), Modality::Eeg);
        }
        assert_ne!(channels[0].samples(), channels[1].samples());
    }

    #[test]
    fn test_noiseless_rhythm() {
        let config = EegSimConfig {
            sampling_rate: 1000.0,
            channel_count: 1,
            noise_std: 0.0,
            seed: Some(1),
            ..Default::default()
        };
        let mut simulator = EegSimulator::new(config).unwrap();
        let signal = simulator.generate_channel(0, 1.0).unwrap();

        // 10 Hz peaks a quarter period in and crosses zero after a full one
        assert!((signal.samples()[25] - 1.0).abs() < 1e-9);
        assert!(signal.samples()[100].abs() < 1e-9);
    }

    #[test]
    fn test_rejects_empty_montage() {
        let config = EegSimConfig { channel_count: 0, ..Default::default() };
        assert!(EegSimulator::new(config).is_err());
    }

    #[test]
    fn test_rejects_negative_noise() {
        let config = EegSimConfig { noise_std: -0.5, ..Default::default() };
        assert!(EegSimulator::new(config).is_err());

        let config = EegSimConfig { noise_std: f64::NAN, ..Default::default() };
        assert!(EegSimulator::new(config).is_err());
    }
}
