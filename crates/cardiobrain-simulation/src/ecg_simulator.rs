//! ECG simulator: tiled beat template with additive Gaussian noise

use crate::waveforms::BeatTemplate;
use cardiobrain_core::{CbError, CbResult, Modality, Signal, SignalMetadata};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Configuration for ECG simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcgSimConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Beat repeated for the whole recording
    pub template: BeatTemplate,
    /// Gaussian noise standard deviation (0.0 = no noise)
    pub noise_std: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for EcgSimConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 1000.0,
            template: BeatTemplate::Spike,
            noise_std: 0.03,
            seed: None,
        }
    }
}

/// ECG signal simulator
pub struct EcgSimulator {
    config: EcgSimConfig,
    rng: StdRng,
    noise: Normal<f64>,
}

impl EcgSimulator {
    pub fn new(config: EcgSimConfig) -> CbResult<Self> {
        SignalMetadata::validate_sampling_rate(config.sampling_rate)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        if !(config.noise_std.is_finite() && config.noise_std >= 0.0) {
            return Err(CbError::config(format!("Invalid ECG noise level: {}", config.noise_std)));
        }
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| CbError::config(format!("Invalid ECG noise level: {}", e)))?;

        Ok(Self { config, rng, noise })
    }

    /// Generate `duration` seconds of ECG
    pub fn generate(&mut self, duration: f64) -> CbResult<Signal> {
        let n = (duration * self.config.sampling_rate).round() as usize;
        let beat = self.config.template.samples();

        let data: Vec<f64> = beat
            .iter()
            .cycle()
            .take(n)
            .map(|&x| x + self.noise.sample(&mut self.rng))
            .collect();

        Signal::new(data, self.config.sampling_rate, Modality::Ecg)
    }

    /// Sample indices of the beat maxima in a generated recording of `len` samples
    pub fn beat_positions(&self, len: usize) -> Vec<usize> {
        let period = self.config.template.period();
        (self.config.template.peak_offset()..len).step_by(period).collect()
    }
}
