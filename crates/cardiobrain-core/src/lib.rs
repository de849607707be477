//! cardiobrain-core: Foundation types for cardiac and brain signal analysis
//!
//! Signals, modality metadata, per-feature outcomes and the shared error type.

pub mod signal;
pub mod modality;
pub mod feature;
pub mod error;

pub use signal::*;
pub use modality::*;
pub use feature::{Feature, FeatureRecord, Unavailable};
pub use error::{CbError, CbResult};
