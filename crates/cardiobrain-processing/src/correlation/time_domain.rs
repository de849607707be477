//! Time-domain association between two aligned signals

use crate::stats::{self, CorrelationTest, CrossCorrelationPeak};
use cardiobrain_core::CbResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDomainCorrelation {
    pub pearson: CorrelationTest,
    pub spearman: CorrelationTest,
    pub cross_correlation: CrossCorrelationPeak,
}

/// Linear, rank and lagged correlation of two equal-length signals
pub fn time_domain(a: &[f64], b: &[f64]) -> CbResult<TimeDomainCorrelation> {
    Ok(TimeDomainCorrelation {
        pearson: stats::pearson(a, b),
        spearman: stats::spearman(a, b),
        cross_correlation: stats::cross_correlation_peak(a, b)?,
    })
}
