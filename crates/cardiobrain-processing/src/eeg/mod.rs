//! EEG feature pipeline
//!
//! Band-pass filtering, amplitude artifact rejection, spectral estimation,
//! band powers, Hjorth parameters and descriptive statistics of a single
//! channel.

pub mod artifacts;
pub mod bands;
pub mod hjorth;

pub use bands::{BandPowers, FrequencyBand, WelchBandPower};
pub use hjorth::{Hjorth, SpectralHjorth, TimeDomainHjorth};

use crate::config::EegConfig;
use crate::estimator::{Estimator, Provenance, WithFallback};
use crate::filters::{ButterworthFilter, FilterConfig, SignalFilter};
use crate::pipeline::Diagnostics;
use crate::spectral::{self, Spectrum};
use crate::stats;
use cardiobrain_core::{CbResult, Feature, FeatureRecord, Modality, Signal, SignalMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Scalar EEG features, in output order
pub const EEG_FEATURES: [&str; 6] = [
    "mean",
    "std",
    "kurtosis",
    "skewness",
    "hjorth_mobility",
    "hjorth_complexity",
];

/// A cleaned EEG epoch and its spectrum, the input of the EEG estimators
#[derive(Debug, Clone, Copy)]
pub struct EegEpoch<'a> {
    pub samples: &'a [f64],
    pub sampling_rate: f64,
    pub spectrum: &'a Spectrum,
}

/// Raw and derived EEG sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EegSignals {
    pub raw: Vec<f64>,
    pub filtered: Vec<f64>,
    pub cleaned: Vec<f64>,
}

/// Complete EEG analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegAnalysis {
    pub signal: EegSignals,
    pub frequency: Spectrum,
    /// Relative band power
    pub bands: BandPowers,
    /// Absolute band power; empty when the estimator failed
    #[serde(default)]
    pub band_power_estimate: BTreeMap<String, f64>,
    pub features: FeatureRecord,
    pub metadata: SignalMetadata,
    #[serde(default)]
    pub artifacts_replaced: usize,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

/// EEG processing pipeline
pub struct EegPipeline {
    config: EegConfig,
}

impl EegPipeline {
    pub fn new(config: &EegConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Zero-phase band-pass; the high edge is pulled below Nyquist when needed
    pub fn filter(&self, raw: &[f64], sampling_rate: f64) -> CbResult<Vec<f64>> {
        let mut high = self.config.high_cutoff;
        if high >= sampling_rate / 2.0 {
            high = 0.45 * sampling_rate;
            warn!(
                "EEG high cutoff {}Hz is not below Nyquist at {}Hz, clamped to {}Hz",
                self.config.high_cutoff, sampling_rate, high
            );
        }
        let filter = ButterworthFilter::new(
            FilterConfig::bandpass(self.config.low_cutoff, high, self.config.filter_order),
            sampling_rate,
        )?;
        Ok(filter.process(raw))
    }

    /// Run every EEG stage on `signal`
    pub fn analyze(&self, signal: &Signal) -> CbResult<EegAnalysis> {
        let fs = signal.sampling_rate();
        let raw = signal.samples();
        let metadata = SignalMetadata::new(Modality::Eeg, fs, raw.len())?;
        let mut diagnostics = Diagnostics::new();

        let filtered = match self.filter(raw, fs) {
            Ok(filtered) => filtered,
            Err(e) => {
                diagnostics.record("filter", format!("{}; using raw signal", e));
                raw.to_vec()
            }
        };

        let rejection = artifacts::reject_artifacts(&filtered, self.config.artifact_z_threshold);
        let cleaned = rejection.cleaned;

        let nperseg = (fs.round() as usize).clamp(1, cleaned.len());
        let frequency = match spectral::welch(&cleaned, fs, nperseg) {
            Ok(spectrum) => spectrum,
            Err(e) => {
                diagnostics.record("psd", e);
                Spectrum::default()
            }
        };
        let bands = BandPowers::relative(&frequency);

        let epoch = EegEpoch { samples: &cleaned, sampling_rate: fs, spectrum: &frequency };

        let estimator = WelchBandPower { segment_seconds: self.config.band_power_segment };
        let band_power_estimate = match estimator.estimate(&epoch) {
            Ok(powers) => powers,
            Err(e) => {
                diagnostics.record("band_power_estimate", e);
                BTreeMap::new()
            }
        };

        let features = self.features(&epoch, &mut diagnostics);
        debug!(
            "EEG {}: {} artifact samples replaced, alpha {:.3}",
            signal.id, rejection.replaced, bands.alpha
        );

        Ok(EegAnalysis {
            signal: EegSignals {
                raw: raw.to_vec(),
                filtered,
                cleaned,
            },
            frequency,
            bands,
            band_power_estimate,
            features,
            metadata,
            artifacts_replaced: rejection.replaced,
            diagnostics,
        })
    }

    /// Statistics and Hjorth parameters; each failure reports 0 for that value only
    fn features(&self, epoch: &EegEpoch<'_>, diagnostics: &mut Diagnostics) -> FeatureRecord {
        let mut record = FeatureRecord::new();
        let data = epoch.samples;

        let mut zero_on_failure = |name: &str, result: CbResult<f64>| {
            let value = match result {
                Ok(v) if v.is_finite() => v,
                Ok(v) => {
                    diagnostics.record(name, format!("non-finite value {}; reported as 0", v));
                    0.0
                }
                Err(e) => {
                    diagnostics.record(name, format!("{}; reported as 0", e));
                    0.0
                }
            };
            record.insert(name, Feature::Available(value));
        };

        zero_on_failure("mean", stats::mean(data));
        zero_on_failure("std", stats::std_dev(data, 0));
        zero_on_failure("kurtosis", stats::kurtosis(data));
        zero_on_failure("skewness", stats::skewness(data));

        let hjorth = WithFallback::new(SpectralHjorth, TimeDomainHjorth).estimate_traced(epoch);
        match hjorth {
            Ok(estimate) => {
                if estimate.provenance == Provenance::Fallback {
                    debug!("Hjorth parameters from time domain");
                }
                zero_on_failure("hjorth_mobility", Ok(estimate.value.mobility));
                zero_on_failure("hjorth_complexity", Ok(estimate.value.complexity));
            }
            Err(e) => {
                zero_on_failure("hjorth_mobility", Err(e.clone()));
                zero_on_failure("hjorth_complexity", Err(e));
            }
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn alpha_eeg(fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 10.0 * t).sin() + 0.2 * (2.0 * PI * 22.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_analyze_alpha_rhythm() {
        let signal = Signal::new(alpha_eeg(250.0, 2500), 250.0, Modality::Eeg).unwrap();
        let analysis = EegPipeline::new(&EegConfig::default()).analyze(&signal).unwrap();

        assert_eq!(analysis.signal.filtered.len(), 2500);
        assert_eq!(analysis.signal.cleaned.len(), 2500);
        assert!(analysis.bands.alpha > 0.8);
        assert!(analysis.bands.total() <= 1.0 + 1e-9);
        assert_eq!(analysis.band_power_estimate.len(), 5);
        assert_eq!(analysis.features.len(), EEG_FEATURES.len());
        assert!(analysis.features.value("hjorth_mobility").unwrap() > 0.0);
        assert_eq!(analysis.metadata.signal_type, Modality::Eeg);
    }

    #[test]
    fn test_zero_eeg() {
        let signal = Signal::new(vec![0.0; 2500], 250.0, Modality::Eeg).unwrap();
        let analysis = EegPipeline::new(&EegConfig::default()).analyze(&signal).unwrap();

        assert_eq!(analysis.bands, BandPowers::default());
        for name in EEG_FEATURES {
            assert_eq!(analysis.features.value(name), Some(0.0), "{}", name);
        }
        assert_eq!(analysis.artifacts_replaced, 0);
        assert!(analysis.signal.cleaned.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_low_rate_clamps_band_edge() {
        let pipeline = EegPipeline::new(&EegConfig::default());
        let filtered = pipeline.filter(&alpha_eeg(64.0, 640), 64.0).unwrap();
        assert_eq!(filtered.len(), 640);
    }

    #[test]
    fn test_short_recording_has_no_band_estimate() {
        let signal = Signal::new(alpha_eeg(250.0, 300), 250.0, Modality::Eeg).unwrap();
        let analysis = EegPipeline::new(&EegConfig::default()).analyze(&signal).unwrap();

        assert!(analysis.band_power_estimate.is_empty());
        assert!(analysis.diagnostics.get("band_power_estimate").is_some());
        assert!(analysis.bands.alpha > 0.5);
    }

    #[test]
    fn test_serialized_layout() {
        let signal = Signal::new(alpha_eeg(250.0, 1000), 250.0, Modality::Eeg).unwrap();
        let analysis = EegPipeline::new(&EegConfig::default()).analyze(&signal).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();

        assert!(json["frequency"]["psd"].is_array());
        assert!(json["bands"]["gamma"].is_number());
        assert!(json["features"]["hjorth_complexity"].is_number());
        assert_eq!(json["metadata"]["signal_type"], "eeg");
    }
}
