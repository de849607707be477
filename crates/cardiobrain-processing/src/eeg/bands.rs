//! EEG frequency bands and band power

use super::EegEpoch;
use crate::estimator::Estimator;
use crate::spectral::{self, Spectrum};
use cardiobrain_core::{CbError, CbResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Frequency band definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    pub name: &'static str,
    pub low_freq: f64,
    pub high_freq: f64,
    /// Whether `high_freq` itself belongs to the band
    pub include_high: bool,
}

impl FrequencyBand {
    const fn new(name: &'static str, low_freq: f64, high_freq: f64) -> Self {
        Self { name, low_freq, high_freq, include_high: false }
    }

    const fn closed(name: &'static str, low_freq: f64, high_freq: f64) -> Self {
        Self { name, low_freq, high_freq, include_high: true }
    }

    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.low_freq && (freq < self.high_freq || (self.include_high && freq <= self.high_freq))
    }
}

/// Bands for relative power; adjacent bands share no bins
pub const RELATIVE_BANDS: [FrequencyBand; 5] = [
    FrequencyBand::new("delta", 0.5, 4.0),
    FrequencyBand::new("theta", 4.0, 8.0),
    FrequencyBand::new("alpha", 8.0, 13.0),
    FrequencyBand::new("beta", 13.0, 30.0),
    FrequencyBand::closed("gamma", 30.0, 45.0),
];

/// Bands for absolute power estimation
pub const ABSOLUTE_BANDS: [FrequencyBand; 5] = [
    FrequencyBand::closed("delta", 1.0, 4.0),
    FrequencyBand::closed("theta", 4.0, 8.0),
    FrequencyBand::closed("alpha", 8.0, 13.0),
    FrequencyBand::closed("beta", 13.0, 30.0),
    FrequencyBand::closed("gamma", 30.0, 45.0),
];

/// Relative power of the five classic EEG bands
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl BandPowers {
    /// Band name and power pairs in ascending frequency order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("delta", self.delta),
            ("theta", self.theta),
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
        ]
        .into_iter()
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|(_, p)| p).sum()
    }

    /// Fraction of the total spectral power in each band; all zero when the spectrum is empty
    pub fn relative(spectrum: &Spectrum) -> Self {
        let total = spectrum.total_power();
        if !(total > 0.0) {
            return Self::default();
        }
        let share = |band: &FrequencyBand| {
            spectrum.band_sum(band.low_freq, band.high_freq, band.include_high) / total
        };
        Self {
            delta: share(&RELATIVE_BANDS[0]),
            theta: share(&RELATIVE_BANDS[1]),
            alpha: share(&RELATIVE_BANDS[2]),
            beta: share(&RELATIVE_BANDS[3]),
            gamma: share(&RELATIVE_BANDS[4]),
        }
    }
}

/// Absolute band power from a Welch spectrum with fixed-duration Hann segments,
/// integrated with the trapezoid rule
pub struct WelchBandPower {
    pub segment_seconds: f64,
}

impl<'a> Estimator<EegEpoch<'a>> for WelchBandPower {
    type Output = BTreeMap<String, f64>;

    fn name(&self) -> &'static str {
        "welch band power"
    }

    fn estimate(&self, epoch: &EegEpoch<'a>) -> CbResult<BTreeMap<String, f64>> {
        let nperseg = (self.segment_seconds * epoch.sampling_rate).round() as usize;
        if epoch.samples.len() < nperseg {
            return Err(CbError::insufficient(format!(
                "band power needs {:.1}s of signal, got {:.1}s",
                self.segment_seconds,
                epoch.samples.len() as f64 / epoch.sampling_rate
            )));
        }

        let spectrum = spectral::welch(epoch.samples, epoch.sampling_rate, nperseg)?;
        let nyquist = epoch.sampling_rate / 2.0;
        Ok(ABSOLUTE_BANDS
            .iter()
            .filter(|band| band.low_freq < nyquist)
            .map(|band| (band.name.to_string(), spectrum.band_integral(band.low_freq, band.high_freq)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    #[test]
    fn test_band_membership() {
        assert!(RELATIVE_BANDS[1].contains(4.0));
        assert!(!RELATIVE_BANDS[0].contains(4.0));
        assert!(RELATIVE_BANDS[4].contains(45.0));
        assert!(!RELATIVE_BANDS[0].contains(0.25));
    }

    #[test]
    fn test_relative_power_alpha_dominant() {
        let fs = 250.0;
        let data = sine(10.0, fs, 2500);
        let spectrum = spectral::welch(&data, fs, 250).unwrap();
        let bands = BandPowers::relative(&spectrum);

        assert!(bands.alpha > 0.9);
        assert!(bands.total() <= 1.0 + 1e-9);
        assert!(bands.iter().all(|(_, p)| p >= 0.0));
    }

    #[test]
    fn test_relative_power_zero_spectrum() {
        let spectrum = Spectrum { freqs: vec![0.0, 1.0, 2.0], psd: vec![0.0; 3] };
        assert_eq!(BandPowers::relative(&spectrum), BandPowers::default());
    }

    #[test]
    fn test_welch_band_power() {
        let fs = 250.0;
        let data = sine(6.0, fs, 5000);
        let spectrum = spectral::welch(&data, fs, 250).unwrap();
        let epoch = EegEpoch { samples: &data, sampling_rate: fs, spectrum: &spectrum };
        let powers = WelchBandPower { segment_seconds: 2.0 }.estimate(&epoch).unwrap();

        assert_eq!(powers.len(), 5);
        // Unit sine carries 0.5 of power, nearly all of it in theta
        assert!((powers["theta"] - 0.5).abs() < 0.05);
        assert!(powers["theta"] > 10.0 * powers["alpha"]);
    }

    #[test]
    fn test_welch_band_power_short_signal() {
        let data = vec![0.0; 100];
        let spectrum = Spectrum::default();
        let epoch = EegEpoch { samples: &data, sampling_rate: 250.0, spectrum: &spectrum };
        assert!(WelchBandPower { segment_seconds: 2.0 }.estimate(&epoch).is_err());
    }
}
