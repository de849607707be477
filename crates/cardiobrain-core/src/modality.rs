//! Modality tags and per-recording metadata

use serde::{Deserialize, Serialize};
use crate::error::{CbError, CbResult};

/// Physiological modality of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Electrocardiogram
    Ecg,
    /// Electroencephalogram
    Eeg,
}

impl Modality {
    /// Lowercase tag used in file names, CSV headers and JSON artifacts
    pub fn tag(&self) -> &'static str {
        match self {
            Modality::Ecg => "ecg",
            Modality::Eeg => "eeg",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Ecg => write!(f, "ECG"),
            Modality::Eeg => write!(f, "EEG"),
        }
    }
}

impl std::str::FromStr for Modality {
    type Err = CbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ecg" => Ok(Modality::Ecg),
            "eeg" => Ok(Modality::Eeg),
            other => Err(CbError::FormatError {
                reason: format!("unknown signal type '{}', expected 'ecg' or 'eeg'", other),
            }),
        }
    }
}

/// Metadata attached to every analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Recording duration in seconds
    pub duration_seconds: f64,
    /// Modality tag
    pub signal_type: Modality,
}

impl SignalMetadata {
    /// Create metadata for a recording of `len` samples
    pub fn new(signal_type: Modality, sampling_rate: f64, len: usize) -> CbResult<Self> {
        Self::validate_sampling_rate(sampling_rate)?;

        Ok(SignalMetadata {
            sampling_rate,
            duration_seconds: len as f64 / sampling_rate,
            signal_type,
        })
    }

    /// Validate a sampling rate
    pub fn validate_sampling_rate(rate: f64) -> CbResult<()> {
        if !rate.is_finite() || rate <= 0.0 {
            Err(CbError::InvalidSamplingRate {
                rate,
                reason: "must be a positive finite number".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_duration() {
        let metadata = SignalMetadata::new(Modality::Eeg, 250.0, 2500).unwrap();
        assert_eq!(metadata.duration_seconds, 10.0);
        assert_eq!(metadata.signal_type, Modality::Eeg);
    }

    #[test]
    fn test_invalid_sampling_rate() {
        assert!(SignalMetadata::new(Modality::Ecg, 0.0, 10).is_err());
        assert!(SignalMetadata::new(Modality::Ecg, f64::NAN, 10).is_err());
        assert!(SignalMetadata::new(Modality::Ecg, -1.0, 10).is_err());
    }

    #[test]
    fn test_modality_parsing() {
        assert_eq!("ECG".parse::<Modality>().unwrap(), Modality::Ecg);
        assert_eq!(" eeg ".parse::<Modality>().unwrap(), Modality::Eeg);
        assert!("emg".parse::<Modality>().is_err());
    }

    #[test]
    fn test_modality_serialization() {
        let json = serde_json::to_string(&Modality::Ecg).unwrap();
        assert_eq!(json, "\"ecg\"");
    }
}
