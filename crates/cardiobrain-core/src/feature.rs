//! Per-feature outcomes
//!
//! Every scalar feature is computed in isolation and is either available or
//! unavailable with a recorded reason. On the wire an unavailable feature is
//! `null`, which is distinct from `0.0`.

use crate::error::CbError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Why a feature could not be computed
#[derive(Debug, Clone, PartialEq)]
pub enum Unavailable {
    /// Peak detection found no heartbeats
    NoBeats,
    /// Fewer beats than the computation needs
    TooFewBeats { needed: usize, found: usize },
    /// Recording or derived series too short
    InsufficientData(String),
    /// Zero variance, zero power or an undefined ratio
    Degenerate(String),
    /// The estimator failed for another reason
    EstimatorFailed(String),
    /// Read back from a serialized `null`; the reason was not persisted
    Unrecorded,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::NoBeats => write!(f, "no R-peaks detected"),
            Unavailable::TooFewBeats { needed, found } => {
                write!(f, "needs at least {} R-peaks, found {}", needed, found)
            }
            Unavailable::InsufficientData(reason) => write!(f, "insufficient data: {}", reason),
            Unavailable::Degenerate(reason) => write!(f, "degenerate input: {}", reason),
            Unavailable::EstimatorFailed(reason) => write!(f, "estimator failed: {}", reason),
            Unavailable::Unrecorded => write!(f, "unavailable"),
        }
    }
}

impl From<CbError> for Unavailable {
    fn from(error: CbError) -> Self {
        match error {
            CbError::InsufficientData { reason } => Unavailable::InsufficientData(reason),
            CbError::DegenerateSegment { reason } => Unavailable::Degenerate(reason),
            other => Unavailable::EstimatorFailed(other.to_string()),
        }
    }
}

/// Outcome of a single scalar feature computation
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Available(f64),
    Unavailable(Unavailable),
}

impl Feature {
    /// Wrap a computed value; non-finite values are never reported as available
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Feature::Available(value)
        } else {
            Feature::Unavailable(Unavailable::Degenerate(format!("non-finite result {}", value)))
        }
    }

    pub fn from_result(result: Result<f64, CbError>) -> Self {
        match result {
            Ok(value) => Feature::from_value(value),
            Err(error) => Feature::Unavailable(error.into()),
        }
    }

    pub fn unavailable(reason: Unavailable) -> Self {
        Feature::Unavailable(reason)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Feature::Available(value) => Some(*value),
            Feature::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Feature::Available(_))
    }

    pub fn reason(&self) -> Option<&Unavailable> {
        match self {
            Feature::Available(_) => None,
            Feature::Unavailable(reason) => Some(reason),
        }
    }
}

impl From<Option<f64>> for Feature {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Feature::from_value(v),
            None => Feature::Unavailable(Unavailable::Unrecorded),
        }
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Feature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<f64>::deserialize(deserializer).map(Feature::from)
    }
}

/// Named feature outcomes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(BTreeMap<String, Feature>);

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, feature: Feature) {
        self.0.insert(name.to_string(), feature);
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.0.get(name)
    }

    /// Available value of `name`; `None` when missing or unavailable
    pub fn value(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Feature::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Feature)> {
        self.0.iter().map(|(name, feature)| (name.as_str(), feature))
    }

    /// Names and reasons of every unavailable feature
    pub fn unavailable(&self) -> impl Iterator<Item = (&str, &Unavailable)> {
        self.iter()
            .filter_map(|(name, feature)| feature.reason().map(|reason| (name, reason)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
