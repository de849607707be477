//! ECG feature pipeline
//!
//! Cleaning, R-peak detection, instantaneous rate, wave delineation and HRV.
//! Every stage is fault isolated: a failing stage is recorded in the
//! diagnostics and its dependent features become unavailable, while the
//! remaining stages still run.

pub mod delineation;
pub mod hrv;
pub mod peaks;
pub mod rate;

pub use delineation::{Delineator, Landmark, PeakSet};
pub use peaks::RPeakDetector;

use crate::config::EcgConfig;
use crate::estimator::{Provenance, WithFallback};
use crate::filters::FilterBank;
use crate::pipeline::Diagnostics;
use cardiobrain_core::{
    CbResult, Feature, FeatureRecord, Modality, Signal, SignalMetadata, Unavailable,
};
use rate::{BeatSeries, IntervalRate, RateSeriesStats};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scalar ECG features, in output order
pub const ECG_FEATURES: [&str; 7] = [
    "mean_hr",
    "min_hr",
    "max_hr",
    "sdnn",
    "rmssd",
    "lf_hf_ratio",
    "sample_entropy",
];

/// Raw and derived ECG sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcgSignals {
    pub raw: Vec<f64>,
    pub cleaned: Vec<f64>,
    /// Per-sample heart rate (BPM); empty with fewer than two beats
    pub heart_rate: Vec<f64>,
}

/// Complete ECG analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgAnalysis {
    pub signal: EcgSignals,
    pub peaks: PeakSet,
    pub features: FeatureRecord,
    pub metadata: SignalMetadata,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

/// ECG processing pipeline
pub struct EcgPipeline {
    config: EcgConfig,
    detector: RPeakDetector,
}

impl EcgPipeline {
    pub fn new(config: &EcgConfig) -> Self {
        Self {
            config: config.clone(),
            detector: RPeakDetector::new(config),
        }
    }

    /// Baseline-wander highpass followed by a powerline notch, both zero-phase
    ///
    /// The notch is skipped when the mains frequency is not below Nyquist.
    pub fn clean(&self, raw: &[f64], sampling_rate: f64) -> CbResult<Vec<f64>> {
        let mut bank = FilterBank::new();
        bank.add_filter(self.config.highpass().build(sampling_rate)?);

        if self.config.powerline_freq < sampling_rate / 2.0 {
            bank.add_filter(self.config.notch().build(sampling_rate)?);
        } else {
            debug!(
                "Powerline notch at {}Hz skipped, Nyquist is {}Hz",
                self.config.powerline_freq,
                sampling_rate / 2.0
            );
        }

        debug!("ECG cleaning chain: {}", bank.filter_names().join(" -> "));
        Ok(bank.process(raw))
    }

    /// Run every ECG stage on `signal`
    pub fn analyze(&self, signal: &Signal) -> CbResult<EcgAnalysis> {
        let fs = signal.sampling_rate();
        let raw = signal.samples();
        let metadata = SignalMetadata::new(Modality::Ecg, fs, raw.len())?;
        let mut diagnostics = Diagnostics::new();

        let cleaned = match self.clean(raw, fs) {
            Ok(cleaned) => cleaned,
            Err(e) => {
                diagnostics.record("cleaning", format!("{}; using raw signal", e));
                raw.to_vec()
            }
        };

        let r_peaks = match self.detector.detect(&cleaned, fs) {
            Ok(peaks) => peaks,
            Err(e) => {
                diagnostics.record("r_peaks", e);
                Vec::new()
            }
        };
        debug!("ECG {}: {} R-peaks in {:.1}s", signal.id, r_peaks.len(), metadata.duration_seconds);

        let heart_rate = rate::instantaneous_rate(&r_peaks, fs, cleaned.len());
        let peaks = self.delineate(&cleaned, r_peaks, fs, &mut diagnostics);
        let features = self.features(&peaks.r_peaks, &heart_rate, fs, &mut diagnostics);
        diagnostics.record_features(&features);

        Ok(EcgAnalysis {
            signal: EcgSignals {
                raw: raw.to_vec(),
                cleaned,
                heart_rate,
            },
            peaks,
            features,
            metadata,
            diagnostics,
        })
    }

    fn delineate(&self, cleaned: &[f64], r_peaks: Vec<usize>, fs: f64, diagnostics: &mut Diagnostics) -> PeakSet {
        let mut set = PeakSet::default();
        if r_peaks.is_empty() {
            return set;
        }

        let delineator = Delineator::new(cleaned, &r_peaks, fs);
        for landmark in Landmark::ALL {
            let found = match delineator.locate(landmark) {
                Ok(found) => found,
                Err(e) => {
                    diagnostics.record(landmark.key(), e);
                    Vec::new()
                }
            };
            match landmark {
                Landmark::P => set.p_peaks = found,
                Landmark::Q => set.q_peaks = found,
                Landmark::S => set.s_peaks = found,
                Landmark::T => set.t_peaks = found,
            }
        }
        set.r_peaks = r_peaks;
        set
    }

    fn features(
        &self,
        r_peaks: &[usize],
        heart_rate: &[f64],
        fs: f64,
        diagnostics: &mut Diagnostics,
    ) -> FeatureRecord {
        let mut record = FeatureRecord::new();
        if r_peaks.is_empty() {
            for name in ECG_FEATURES {
                record.insert(name, Feature::unavailable(Unavailable::NoBeats));
            }
            return record;
        }

        let too_few = |needed: usize| {
            Feature::unavailable(Unavailable::TooFewBeats { needed, found: r_peaks.len() })
        };

        // Interval-related
        let beats = BeatSeries { r_peaks, sampling_rate: fs, heart_rate };
        let interval = WithFallback::new(IntervalRate, RateSeriesStats);
        match interval.estimate_traced(&beats) {
            Ok(estimate) => {
                if estimate.provenance == Provenance::Fallback {
                    if let Some(reason) = &estimate.primary_error {
                        diagnostics.record("heart_rate", format!("{}; used rate series", reason));
                    }
                }
                record.insert("mean_hr", Feature::from_value(estimate.value.mean));
                record.insert("min_hr", Feature::from_value(estimate.value.min));
                record.insert("max_hr", Feature::from_value(estimate.value.max));
            }
            Err(e) => {
                let feature = if r_peaks.len() < 2 { too_few(2) } else { Feature::from_result(Err(e)) };
                for name in ["mean_hr", "min_hr", "max_hr"] {
                    record.insert(name, feature.clone());
                }
            }
        }

        let rr = hrv::rr_intervals_ms(r_peaks, fs);

        // Time domain
        if r_peaks.len() < 3 {
            record.insert("sdnn", too_few(3));
            record.insert("rmssd", too_few(3));
        } else {
            match hrv::time_domain(&rr) {
                Ok(td) => {
                    record.insert("sdnn", Feature::from_value(td.sdnn));
                    record.insert("rmssd", Feature::from_value(td.rmssd));
                }
                Err(e) => {
                    record.insert("sdnn", Feature::from_result(Err(e.clone())));
                    record.insert("rmssd", Feature::from_result(Err(e)));
                }
            }
        }

        // Frequency domain
        let lf_hf = if r_peaks.len() < 3 {
            too_few(3)
        } else {
            Feature::from_result(hrv::lf_hf_ratio(r_peaks, fs, &self.config))
        };
        record.insert("lf_hf_ratio", lf_hf);

        // Nonlinear
        let m = self.config.entropy_dimension;
        let entropy = if rr.len() < m + 2 {
            too_few(m + 3)
        } else {
            Feature::from_result(hrv::sample_entropy(&rr, m, self.config.entropy_tolerance))
        };
        record.insert("sample_entropy", entropy);

        record
    }
}
