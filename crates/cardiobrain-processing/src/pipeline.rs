//! Modality dispatch and stage diagnostics shared by the feature pipelines

use crate::config::ProcessingConfig;
use crate::correlation::{CorrelationEngine, CorrelationReport};
use crate::ecg::{EcgAnalysis, EcgPipeline};
use crate::eeg::{EegAnalysis, EegPipeline};
use cardiobrain_core::{CbError, CbResult, FeatureRecord, Modality, Signal, SignalMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Stage or feature name mapped to the reason it was degraded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(BTreeMap<String, String>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a degraded stage; a later record for the same name replaces the earlier one
    pub fn record(&mut self, name: &str, reason: impl fmt::Display) {
        let reason = reason.to_string();
        warn!("{} degraded: {}", name, reason);
        self.0.insert(name.to_string(), reason);
    }

    /// Record the reason of every unavailable feature not already explained
    pub fn record_features(&mut self, features: &FeatureRecord) {
        for (name, reason) in features.unavailable() {
            if !self.0.contains_key(name) {
                self.record(name, reason);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Result of a single-modality analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Ecg(EcgAnalysis),
    Eeg(EegAnalysis),
}

impl AnalysisResult {
    pub fn modality(&self) -> Modality {
        match self {
            AnalysisResult::Ecg(_) => Modality::Ecg,
            AnalysisResult::Eeg(_) => Modality::Eeg,
        }
    }

    pub fn features(&self) -> &FeatureRecord {
        match self {
            AnalysisResult::Ecg(a) => &a.features,
            AnalysisResult::Eeg(a) => &a.features,
        }
    }

    pub fn metadata(&self) -> &SignalMetadata {
        match self {
            AnalysisResult::Ecg(a) => &a.metadata,
            AnalysisResult::Eeg(a) => &a.metadata,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            AnalysisResult::Ecg(a) => &a.diagnostics,
            AnalysisResult::Eeg(a) => &a.diagnostics,
        }
    }

    pub fn as_ecg(&self) -> Option<&EcgAnalysis> {
        match self {
            AnalysisResult::Ecg(a) => Some(a),
            AnalysisResult::Eeg(_) => None,
        }
    }

    pub fn as_eeg(&self) -> Option<&EegAnalysis> {
        match self {
            AnalysisResult::Eeg(a) => Some(a),
            AnalysisResult::Ecg(_) => None,
        }
    }

    pub fn to_json(&self) -> CbResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CbError::FormatError {
            reason: format!("failed to serialize analysis: {}", e),
        })
    }

    /// Parse a stored analysis, choosing the variant from `metadata.signal_type`
    pub fn from_json(json: &str) -> CbResult<Self> {
        let format_error = |e: serde_json::Error| CbError::FormatError {
            reason: format!("invalid analysis JSON: {}", e),
        };
        let value: serde_json::Value = serde_json::from_str(json).map_err(format_error)?;
        let modality: Modality = serde_json::from_value(value["metadata"]["signal_type"].clone())
            .map_err(format_error)?;
        match modality {
            Modality::Ecg => serde_json::from_value(value).map(AnalysisResult::Ecg),
            Modality::Eeg => serde_json::from_value(value).map(AnalysisResult::Eeg),
        }
        .map_err(format_error)
    }
}

/// ECG, EEG and correlation stages built from one configuration
pub struct Pipeline {
    ecg: EcgPipeline,
    eeg: EegPipeline,
    correlation: CorrelationEngine,
    name: String,
}

impl Pipeline {
    pub fn new(config: &ProcessingConfig) -> CbResult<Self> {
        config.validate()?;
        Ok(Self {
            ecg: EcgPipeline::new(&config.ecg),
            eeg: EegPipeline::new(&config.eeg),
            correlation: CorrelationEngine::new(&config.correlation),
            name: config.name.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Analyze a signal with the pipeline matching its modality
    pub fn analyze(&self, signal: &Signal) -> CbResult<AnalysisResult> {
        debug!("{}: analyzing {} signal {}", self.name, signal.modality(), signal.id);
        match signal.modality() {
            Modality::Ecg => self.ecg.analyze(signal).map(AnalysisResult::Ecg),
            Modality::Eeg => self.eeg.analyze(signal).map(AnalysisResult::Eeg),
        }
    }

    pub fn correlate(&self, ecg: &EcgAnalysis, eeg: &EegAnalysis) -> CbResult<CorrelationReport> {
        self.correlation.correlate(ecg, eeg)
    }
}

/// One-shot analysis with a freshly built pipeline
pub fn analyze(signal: &Signal, config: &ProcessingConfig) -> CbResult<AnalysisResult> {
    Pipeline::new(config)?.analyze(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardiobrain_core::{Feature, Unavailable};
    use std::f64::consts::PI;

    #[test]
    fn test_diagnostics_record() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        diagnostics.record("psd", "too short");
        diagnostics.record("psd", "still too short");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.get("psd").map(String::as_str), Some("still too short"));
    }

    #[test]
    fn test_record_features_keeps_stage_reason() {
        let mut features = FeatureRecord::new();
        features.insert("mean_hr", Feature::Available(72.0));
        features.insert("sdnn", Feature::unavailable(Unavailable::NoBeats));
        features.insert("rmssd", Feature::unavailable(Unavailable::NoBeats));

        let mut diagnostics = Diagnostics::new();
        diagnostics.record("rmssd", "custom reason");
        diagnostics.record_features(&features);

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.get("mean_hr").is_none());
        assert_eq!(diagnostics.get("sdnn").map(String::as_str), Some("no R-peaks detected"));
        assert_eq!(diagnostics.get("rmssd").map(String::as_str), Some("custom reason"));
    }

    #[test]
    fn test_diagnostics_serialize_as_map() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("filter", "bad band");
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(json["filter"], "bad band");
    }

    #[test]
    fn test_dispatch_by_modality() {
        let config = ProcessingConfig::default();
        let eeg: Vec<f64> = (0..1000).map(|i| (2.0 * PI * 10.0 * i as f64 / 250.0).sin()).collect();
        let signal = Signal::new(eeg, 250.0, Modality::Eeg).unwrap();

        let result = analyze(&signal, &config).unwrap();
        assert_eq!(result.modality(), Modality::Eeg);
        assert!(result.as_ecg().is_none());
        assert_eq!(result.metadata().sampling_rate, 250.0);

        let parsed = AnalysisResult::from_json(&result.to_json().unwrap()).unwrap();
        assert_eq!(parsed.modality(), Modality::Eeg);
    }

    #[test]
    fn test_from_json_rejects_missing_type() {
        assert!(AnalysisResult::from_json("{\"metadata\": {}}").is_err());
        assert!(AnalysisResult::from_json("not json").is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ProcessingConfig::default();
        config.eeg.low_cutoff = -1.0;
        assert!(Pipeline::new(&config).is_err());
    }
}
