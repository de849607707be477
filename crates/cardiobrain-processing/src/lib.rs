//! cardiobrain-processing: ECG and EEG feature pipelines and the correlation engine
//!
//! Zero-phase filtering, spectral estimation, resampling and statistics
//! underpin one pipeline per modality. The correlation engine consumes the
//! results of both pipelines.

pub mod config;
pub mod filters;
pub mod spectral;
pub mod resample;
pub mod stats;
pub mod estimator;
pub mod ecg;
pub mod eeg;
pub mod correlation;
pub mod pipeline;

pub use config::{CorrelationConfig, EcgConfig, EegConfig, IngestConfig, ProcessingConfig};
pub use filters::{ButterworthFilter, FilterBank, FilterConfig, FilterType, NotchFilter, SignalFilter};
pub use spectral::Spectrum;
pub use resample::{align, resample, AlignedPair};
pub use estimator::{Estimate, Estimator, Provenance, WithFallback};
pub use ecg::{EcgAnalysis, EcgPipeline, PeakSet, ECG_FEATURES};
pub use eeg::{BandPowers, EegAnalysis, EegPipeline, EEG_FEATURES};
pub use correlation::{CorrelationEngine, CorrelationReport, PhaseLockingStatus};
pub use pipeline::{analyze, AnalysisResult, Diagnostics, Pipeline};
