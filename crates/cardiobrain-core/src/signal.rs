//! Signal: Immutable container for a single-channel recording

use crate::error::{CbError, CbResult};
use crate::modality::{Modality, SignalMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Single-channel sampled recording
///
/// Samples are never modified after construction. Derived signals
/// (cleaned, filtered, resampled) are built as new values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Unique identifier for this recording
    pub id: Uuid,
    samples: Vec<f64>,
    sampling_rate: f64,
    modality: Modality,
}

impl Signal {
    /// Create a signal, validating rate, length and sample values
    pub fn new(samples: Vec<f64>, sampling_rate: f64, modality: Modality) -> CbResult<Self> {
        SignalMetadata::validate_sampling_rate(sampling_rate)?;

        if samples.is_empty() {
            return Err(CbError::InvalidSignalData {
                reason: format!("{} signal has zero length", modality),
            });
        }

        if let Some(idx) = samples.iter().position(|x| !x.is_finite()) {
            return Err(CbError::InvalidSignalData {
                reason: format!("{} sample {} is not finite", modality, idx),
            });
        }

        Ok(Signal {
            id: Uuid::new_v4(),
            samples,
            sampling_rate,
            modality,
        })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed signal
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Signal duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sampling_rate
    }

    /// Metadata record for analysis results
    pub fn metadata(&self) -> SignalMetadata {
        SignalMetadata {
            sampling_rate: self.sampling_rate,
            duration_seconds: self.duration(),
            signal_type: self.modality,
        }
    }

    /// Time vector in seconds
    pub fn time_vector(&self) -> Vec<f64> {
        let dt = 1.0 / self.sampling_rate;
        (0..self.samples.len()).map(|i| i as f64 * dt).collect()
    }
}
