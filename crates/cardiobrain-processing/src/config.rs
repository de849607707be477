//! Configuration management for ECG/EEG analysis

use crate::filters::FilterConfig;
use cardiobrain_core::{config_error, CbError, CbResult};
use serde::{Deserialize, Serialize};

/// Global analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Configuration name/profile
    pub name: String,
    /// Loading parameters
    pub ingest: IngestConfig,
    /// ECG pipeline parameters
    pub ecg: EcgConfig,
    /// EEG pipeline parameters
    pub eeg: EegConfig,
    /// Correlation engine parameters
    pub correlation: CorrelationConfig,
}

/// Parameters applied when a recording is loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Sampling rate assumed for formats without rate metadata (CSV/TXT)
    pub default_sampling_rate: f64,
}

/// ECG cleaning, beat detection and HRV parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgConfig {
    /// Baseline-wander highpass cutoff (Hz)
    pub highpass_cutoff: f64,
    /// Baseline-wander highpass order
    pub highpass_order: usize,
    /// Mains frequency to suppress (Hz), typically 50 or 60
    pub powerline_freq: f64,
    /// Quality factor of the powerline notch
    pub notch_q: f64,
    /// QRS-emphasis band (Hz)
    pub qrs_band: (f64, f64),
    /// QRS-emphasis filter order
    pub qrs_order: usize,
    /// Moving-integration window (s)
    pub integration_window: f64,
    /// Minimum distance between R-peaks (s)
    pub refractory_period: f64,
    /// Detection threshold relative to the 98th percentile of the QRS envelope
    pub threshold_ratio: f64,
    /// Half-width of the R-peak refinement search (s)
    pub refine_window: f64,
    /// Tachogram interpolation rate for frequency-domain HRV (Hz)
    pub tachogram_rate: f64,
    /// Low-frequency HRV band (Hz)
    pub lf_band: (f64, f64),
    /// High-frequency HRV band (Hz)
    pub hf_band: (f64, f64),
    /// Sample entropy embedding dimension
    pub entropy_dimension: usize,
    /// Sample entropy tolerance as a fraction of the RR standard deviation
    pub entropy_tolerance: f64,
}

/// EEG filtering, artifact and spectral parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EegConfig {
    /// Bandpass low edge (Hz)
    pub low_cutoff: f64,
    /// Bandpass high edge (Hz)
    pub high_cutoff: f64,
    /// Bandpass order per edge
    pub filter_order: usize,
    /// |z| above which a sample is treated as an artifact
    pub artifact_z_threshold: f64,
    /// Segment length of the band-power estimator (s)
    pub band_power_segment: f64,
}

/// Correlation engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Minimum aligned duration for phase locking (s)
    pub plv_min_duration: f64,
    /// Upper frequency of the phase-locking band (Hz)
    pub plv_max_freq: f64,
    /// Window length of the cross-spectral phase-locking estimator (s)
    pub plv_window: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { default_sampling_rate: 1000.0 }
    }
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            highpass_cutoff: 0.5,
            highpass_order: 5,
            powerline_freq: 50.0,
            notch_q: 30.0,
            qrs_band: (5.0, 30.0),
            qrs_order: 2,
            integration_window: 0.05,
            refractory_period: 0.2,
            threshold_ratio: 0.3,
            refine_window: 0.05,
            tachogram_rate: 4.0,
            lf_band: (0.04, 0.15),
            hf_band: (0.15, 0.40),
            entropy_dimension: 2,
            entropy_tolerance: 0.2,
        }
    }
}

impl EcgConfig {
    /// Baseline-wander highpass for ECG cleaning
    pub fn highpass(&self) -> FilterConfig {
        FilterConfig::highpass(self.highpass_cutoff, self.highpass_order)
    }

    /// Powerline notch for ECG cleaning
    pub fn notch(&self) -> FilterConfig {
        FilterConfig::notch(self.powerline_freq, self.notch_q)
    }
}

impl Default for EegConfig {
    fn default() -> Self {
        Self {
            low_cutoff: 0.5,
            high_cutoff: 45.0,
            filter_order: 2,
            artifact_z_threshold: 3.0,
            band_power_segment: 2.0,
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            plv_min_duration: 10.0,
            plv_max_freq: 45.0,
            plv_window: 1.0,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Preset configurations for common scenarios
impl ProcessingConfig {
    /// Defaults for 50 Hz mains regions
    pub fn standard() -> Self {
        Self {
            name: "Standard (50 Hz mains)".to_string(),
            ingest: IngestConfig::default(),
            ecg: EcgConfig::default(),
            eeg: EegConfig::default(),
            correlation: CorrelationConfig::default(),
        }
    }

    /// Defaults for 60 Hz mains regions
    pub fn mains_60hz() -> Self {
        let mut config = Self::standard();
        config.name = "Standard (60 Hz mains)".to_string();
        config.ecg.powerline_freq = 60.0;
        config
    }

    /// Validate entire configuration
    pub fn validate(&self) -> CbResult<()> {
        let ingest = &self.ingest;
        if !(ingest.default_sampling_rate.is_finite() && ingest.default_sampling_rate > 0.0) {
            return Err(CbError::config("Default sampling rate must be positive"));
        }

        self.validate_ecg()?;
        self.validate_eeg()?;

        let corr = &self.correlation;
        if corr.plv_min_duration < 0.0 {
            return Err(CbError::config("PLV minimum duration cannot be negative"));
        }
        if corr.plv_max_freq <= 0.0 || corr.plv_window <= 0.0 {
            return Err(CbError::config("PLV frequency limit and window must be positive"));
        }

        Ok(())
    }

    fn validate_ecg(&self) -> CbResult<()> {
        let ecg = &self.ecg;
        if ecg.highpass_cutoff <= 0.0 || ecg.powerline_freq <= 0.0 || ecg.notch_q <= 0.0 {
            return Err(CbError::config("ECG cleaning frequencies and notch Q must be positive"));
        }
        if !(1..=10).contains(&ecg.highpass_order) || !(1..=10).contains(&ecg.qrs_order) {
            return Err(CbError::config("ECG filter orders must be between 1 and 10"));
        }
        if !(0.0 < ecg.qrs_band.0 && ecg.qrs_band.0 < ecg.qrs_band.1) {
            return Err(config_error!(
                "QRS band {:?} must be an increasing positive range",
                ecg.qrs_band
            ));
        }
        if ecg.refractory_period <= 0.0 || ecg.integration_window <= 0.0 || ecg.refine_window < 0.0 {
            return Err(CbError::config("ECG detection windows must be positive"));
        }
        if !(0.0 < ecg.threshold_ratio && ecg.threshold_ratio < 1.0) {
            return Err(CbError::config("Detection threshold ratio must be in (0, 1)"));
        }
        if ecg.tachogram_rate <= 0.0 {
            return Err(CbError::config("Tachogram rate must be positive"));
        }
        for (name, band) in [("LF", ecg.lf_band), ("HF", ecg.hf_band)] {
            if !(0.0 <= band.0 && band.0 < band.1) {
                return Err(config_error!("{} band {:?} is not an increasing range", name, band));
            }
        }
        if ecg.entropy_dimension == 0 || ecg.entropy_tolerance <= 0.0 {
            return Err(CbError::config("Sample entropy parameters must be positive"));
        }
        Ok(())
    }

    fn validate_eeg(&self) -> CbResult<()> {
        let eeg = &self.eeg;
        if !(0.0 < eeg.low_cutoff && eeg.low_cutoff < eeg.high_cutoff) {
            return Err(config_error!(
                "EEG band {}..{}Hz must be an increasing positive range",
                eeg.low_cutoff, eeg.high_cutoff
            ));
        }
        if !(1..=10).contains(&eeg.filter_order) {
            return Err(CbError::config("EEG filter order must be between 1 and 10"));
        }
        if eeg.artifact_z_threshold <= 0.0 || eeg.band_power_segment <= 0.0 {
            return Err(CbError::config("Artifact threshold and band-power segment must be positive"));
        }
        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> CbResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| config_error!("Failed to serialize configuration: {}", e))
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> CbResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| config_error!("Failed to deserialize configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}
