//! Hjorth mobility and complexity

use super::EegEpoch;
use crate::estimator::Estimator;
use crate::stats;
use cardiobrain_core::{CbError, CbResult};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hjorth {
    pub mobility: f64,
    pub complexity: f64,
}

/// Hjorth parameters from spectral moments of the PSD
///
/// The derivative is the first difference, whose power gain at frequency f
/// is `(2·sin(πf/fs))²`, so the moments match the time-domain definition.
pub struct SpectralHjorth;

impl<'a> Estimator<EegEpoch<'a>> for SpectralHjorth {
    type Output = Hjorth;

    fn name(&self) -> &'static str {
        "spectral hjorth"
    }

    fn estimate(&self, epoch: &EegEpoch<'a>) -> CbResult<Hjorth> {
        let spectrum = epoch.spectrum;
        if spectrum.is_empty() {
            return Err(CbError::insufficient("no spectrum"));
        }

        let (mut m0, mut m2, mut m4) = (0.0, 0.0, 0.0);
        for (&f, &p) in spectrum.freqs.iter().zip(&spectrum.psd) {
            let gain = (2.0 * (PI * f / epoch.sampling_rate).sin()).powi(2);
            m0 += p;
            m2 += gain * p;
            m4 += gain * gain * p;
        }

        if !(m0 > 0.0 && m2 > 0.0) {
            return Err(CbError::degenerate("spectrum carries no power"));
        }
        let mobility = (m2 / m0).sqrt();
        let complexity = (m4 / m2).sqrt() / mobility;
        Ok(Hjorth { mobility, complexity })
    }
}

/// Hjorth parameters from standard deviations of the signal and its differences
pub struct TimeDomainHjorth;

impl<'a> Estimator<EegEpoch<'a>> for TimeDomainHjorth {
    type Output = Hjorth;

    fn name(&self) -> &'static str {
        "time-domain hjorth"
    }

    fn estimate(&self, epoch: &EegEpoch<'a>) -> CbResult<Hjorth> {
        let first = stats::diff(epoch.samples);
        let second = stats::diff(&first);
        if second.is_empty() {
            return Err(CbError::insufficient("hjorth parameters need at least 3 samples"));
        }

        let sx = stats::std_dev(epoch.samples, 0)?;
        let sd = stats::std_dev(&first, 0)?;
        let sdd = stats::std_dev(&second, 0)?;

        let mobility = if sx > 0.0 { sd / sx } else { 0.0 };
        let complexity = if sd > 0.0 && mobility > 0.0 { (sdd / sd) / mobility } else { 0.0 };
        Ok(Hjorth { mobility, complexity })
    }
}
