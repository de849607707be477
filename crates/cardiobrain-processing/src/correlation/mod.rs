//! Cross-modal correlation engine
//!
//! Aligns a cleaned ECG and a cleaned EEG to a common rate and length, then
//! reports time-domain correlation, band coherence, a phase-locking value
//! and descriptive HRV to EEG band ratios.

pub mod frequency;
pub mod time_domain;

pub use frequency::{
    coherence_summary, CoherenceSummary, HilbertPlv, PhaseLockingStatus, PhasePair, WindowedPlv,
};
pub use time_domain::TimeDomainCorrelation;

use crate::config::CorrelationConfig;
use crate::ecg::EcgAnalysis;
use crate::eeg::{BandPowers, EegAnalysis};
use crate::estimator::{Provenance, WithFallback};
use crate::pipeline::Diagnostics;
use crate::resample::{self, AlignedPair};
use cardiobrain_core::{CbResult, FeatureRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// HRV features related to EEG band power
pub const HRV_RATIO_FEATURES: [&str; 3] = ["sdnn", "rmssd", "lf_hf_ratio"];

/// Lowest phase-locking frequency (Hz)
const PLV_MIN_FREQ: f64 = 2.0;

/// Cycles of the lowest phase-locking frequency that must fit in the recording
const PLV_MIN_CYCLES: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyDomainCorrelation {
    pub coherence: CoherenceSummary,
    /// 0.0 unless `phase_locking_status` is `computed`
    pub phase_locking_value: f64,
    pub phase_locking_status: PhaseLockingStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMetadata {
    pub sampling_rate: f64,
    pub aligned_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecg_analysis_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eeg_analysis_id: Option<String>,
}

/// Complete correlation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub time_domain: TimeDomainCorrelation,
    pub frequency_domain: FrequencyDomainCorrelation,
    /// HRV feature name to band name to ratio
    pub hrv_eeg_correlation: BTreeMap<String, BTreeMap<String, f64>>,
    pub metadata: CorrelationMetadata,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl CorrelationReport {
    /// Tag the report with the identifiers of the analyses it was built from
    pub fn with_analysis_ids(mut self, ecg_id: impl Into<String>, eeg_id: impl Into<String>) -> Self {
        self.metadata.ecg_analysis_id = Some(ecg_id.into());
        self.metadata.eeg_analysis_id = Some(eeg_id.into());
        self
    }
}

/// Ratio of each available HRV feature to each EEG band power; 0 where the band is empty
pub fn hrv_eeg_ratio(features: &FeatureRecord, bands: &BandPowers) -> BTreeMap<String, BTreeMap<String, f64>> {
    HRV_RATIO_FEATURES
        .iter()
        .filter_map(|&name| features.value(name).map(|value| (name, value)))
        .map(|(name, value)| {
            let ratios = bands
                .iter()
                .map(|(band, power)| {
                    let ratio = if power > 0.0 { value / power } else { 0.0 };
                    (band.to_string(), ratio)
                })
                .collect();
            (name.to_string(), ratios)
        })
        .collect()
}

/// ECG to EEG correlation engine
pub struct CorrelationEngine {
    config: CorrelationConfig,
}

impl CorrelationEngine {
    pub fn new(config: &CorrelationConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Correlate the cleaned signals and features of two analyses
    ///
    /// Only alignment and time-domain failures are errors; coherence and
    /// phase locking degrade to defaults recorded in the diagnostics.
    pub fn correlate(&self, ecg: &EcgAnalysis, eeg: &EegAnalysis) -> CbResult<CorrelationReport> {
        let aligned = resample::align(
            &ecg.signal.cleaned,
            ecg.metadata.sampling_rate,
            &eeg.signal.cleaned,
            eeg.metadata.sampling_rate,
        )?;

        let mut diagnostics = Diagnostics::new();
        let time_domain = time_domain::time_domain(&aligned.first, &aligned.second)?;

        let coherence = match coherence_summary(&aligned.first, &aligned.second, aligned.sampling_rate) {
            Ok(summary) => summary,
            Err(e) => {
                diagnostics.record("coherence", e);
                CoherenceSummary::default()
            }
        };

        let (phase_locking_value, phase_locking_status) = self.phase_locking(&aligned, &mut diagnostics);

        Ok(CorrelationReport {
            time_domain,
            frequency_domain: FrequencyDomainCorrelation {
                coherence,
                phase_locking_value,
                phase_locking_status,
            },
            hrv_eeg_correlation: hrv_eeg_ratio(&ecg.features, &eeg.bands),
            metadata: CorrelationMetadata {
                sampling_rate: aligned.sampling_rate,
                aligned_length: aligned.len(),
                ecg_analysis_id: None,
                eeg_analysis_id: None,
            },
            diagnostics,
        })
    }

    fn phase_locking(&self, aligned: &AlignedPair, diagnostics: &mut Diagnostics) -> (f64, PhaseLockingStatus) {
        let duration = aligned.duration();
        if duration < self.config.plv_min_duration {
            info!(
                "Phase locking skipped: {:.1}s aligned, {:.1}s required",
                duration, self.config.plv_min_duration
            );
            return (0.0, PhaseLockingStatus::SkippedInsufficientDuration);
        }

        let pair = PhasePair {
            a: &aligned.first,
            b: &aligned.second,
            sampling_rate: aligned.sampling_rate,
            min_freq: PLV_MIN_FREQ.max(PLV_MIN_CYCLES / duration),
            max_freq: self.config.plv_max_freq.min(aligned.sampling_rate / 2.0),
        };
        let estimator = WithFallback::new(
            WindowedPlv { window_seconds: self.config.plv_window },
            HilbertPlv,
        );

        match estimator.estimate_traced(&pair) {
            Ok(estimate) => {
                if estimate.provenance == Provenance::Fallback {
                    debug!("Phase locking from the analytic signal");
                }
                (estimate.value, PhaseLockingStatus::Computed)
            }
            Err(e) => {
                diagnostics.record("phase_locking_value", e);
                (0.0, PhaseLockingStatus::Failed)
            }
        }
    }
}
