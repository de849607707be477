//! Zero-phase IIR filters for offline biosignal conditioning
//!
//! Filters are cascades of second-order sections run forward and backward
//! over a fully buffered recording, so they add no phase delay.

use cardiobrain_core::{CbError, CbResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Filter types supported by the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    /// Butterworth lowpass filter
    ButterworthLowpass,
    /// Butterworth highpass filter
    ButterworthHighpass,
    /// Butterworth bandpass filter
    ButterworthBandpass,
    /// Notch filter for powerline interference
    Notch,
}

/// Filter configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Filter type
    pub filter_type: FilterType,
    /// Filter order (per edge for bandpass)
    pub order: usize,
    /// Cutoff frequency for lowpass/highpass (Hz)
    pub cutoff_freq: Option<f64>,
    /// Low cutoff for bandpass (Hz)
    pub low_cutoff: Option<f64>,
    /// High cutoff for bandpass (Hz)
    pub high_cutoff: Option<f64>,
    /// Notch frequency (Hz) - typically 50 or 60
    pub notch_freq: Option<f64>,
    /// Notch quality factor
    pub notch_q: Option<f64>,
}

impl FilterConfig {
    /// Create lowpass filter configuration
    pub fn lowpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthLowpass,
            order,
            cutoff_freq: Some(cutoff_freq),
            low_cutoff: None,
            high_cutoff: None,
            notch_freq: None,
            notch_q: None,
        }
    }

    /// Create highpass filter configuration
    pub fn highpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthHighpass,
            order,
            cutoff_freq: Some(cutoff_freq),
            low_cutoff: None,
            high_cutoff: None,
            notch_freq: None,
            notch_q: None,
        }
    }

    /// Create bandpass filter configuration
    pub fn bandpass(low_cutoff: f64, high_cutoff: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthBandpass,
            order,
            cutoff_freq: None,
            low_cutoff: Some(low_cutoff),
            high_cutoff: Some(high_cutoff),
            notch_freq: None,
            notch_q: None,
        }
    }

    /// Create notch filter configuration
    pub fn notch(freq: f64, q: f64) -> Self {
        Self {
            filter_type: FilterType::Notch,
            order: 2,
            cutoff_freq: None,
            low_cutoff: None,
            high_cutoff: None,
            notch_freq: Some(freq),
            notch_q: Some(q),
        }
    }

    /// Build the filter for a sampling rate
    pub fn build(&self, sampling_rate: f64) -> CbResult<Box<dyn SignalFilter>> {
        match self.filter_type {
            FilterType::Notch => {
                let freq = self.notch_freq.ok_or_else(|| CbError::config("Notch filter requires notch frequency"))?;
                let q = self.notch_q.unwrap_or(30.0);
                Ok(Box::new(NotchFilter::new(freq, q, sampling_rate)?))
            }
            _ => Ok(Box::new(ButterworthFilter::new(self.clone(), sampling_rate)?)),
        }
    }
}

/// Zero-phase filter over a fully buffered signal
pub trait SignalFilter: Send + Sync {
    /// Filter forward and backward; output has the input's length
    fn process(&self, input: &[f64]) -> Vec<f64>;

    /// Get filter name/identifier
    fn name(&self) -> &str;
}

/// Single biquad section (2nd order)
#[derive(Debug, Clone, Copy, PartialEq)]
struct BiquadSection {
    // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
    b0: f64, b1: f64, b2: f64,
    a1: f64, a2: f64,
}

impl BiquadSection {
    fn dc_gain(&self) -> f64 {
        let den = 1.0 + self.a1 + self.a2;
        if den.abs() < f64::EPSILON {
            0.0
        } else {
            (self.b0 + self.b1 + self.b2) / den
        }
    }

    /// Transposed direct-form II state that a constant input `u` settles into
    fn steady_state(&self, u: f64) -> (f64, f64) {
        let y = u * self.dc_gain();
        let z2 = self.b2 * u - self.a2 * y;
        let z1 = self.b1 * u - self.a1 * y + z2;
        (z1, z2)
    }
}

/// Cascade of second-order sections
#[derive(Debug, Clone, PartialEq)]
struct SosCascade {
    sections: Vec<BiquadSection>,
}

impl SosCascade {
    /// Single causal pass with states initialised to the steady state of `data[0]`
    fn run(&self, data: &[f64]) -> Vec<f64> {
        let mut output = data.to_vec();
        let Some(&first) = data.first() else {
            return output;
        };

        let mut level = first;
        for section in &self.sections {
            let (mut z1, mut z2) = section.steady_state(level);
            level *= section.dc_gain();

            for sample in output.iter_mut() {
                let x = *sample;
                let y = section.b0 * x + z1;
                z1 = section.b1 * x - section.a1 * y + z2;
                z2 = section.b2 * x - section.a2 * y;
                *sample = y;
            }
        }

        output
    }

    /// Forward-backward filtering with odd-extension padding at both ends
    fn filtfilt(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        if n == 0 {
            return Vec::new();
        }

        let padlen = (3 * (2 * self.sections.len() + 1)).min(n - 1);
        let first = data[0];
        let last = data[n - 1];

        let mut extended = Vec::with_capacity(n + 2 * padlen);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * first - data[i]));
        extended.extend_from_slice(data);
        extended.extend((n - 1 - padlen..n - 1).rev().map(|i| 2.0 * last - data[i]));

        let mut forward = self.run(&extended);
        forward.reverse();
        let mut backward = self.run(&forward);
        backward.reverse();

        backward[padlen..padlen + n].to_vec()
    }
}

/// Butterworth filter implemented as biquad sections
pub struct ButterworthFilter {
    cascade: SosCascade,
}

impl ButterworthFilter {
    pub fn new(filter_config: FilterConfig, sampling_rate: f64) -> CbResult<Self> {
        if !(1..=10).contains(&filter_config.order) {
            return Err(CbError::config(format!(
                "Butterworth order must be between 1 and 10, got {}",
                filter_config.order
            )));
        }

        let sections = match filter_config.filter_type {
            FilterType::ButterworthLowpass => {
                let cutoff = filter_config.cutoff_freq
                    .ok_or_else(|| CbError::config("Lowpass filter requires cutoff frequency"))?;
                Self::design_sections(cutoff, sampling_rate, filter_config.order, false)?
            }
            FilterType::ButterworthHighpass => {
                let cutoff = filter_config.cutoff_freq
                    .ok_or_else(|| CbError::config("Highpass filter requires cutoff frequency"))?;
                Self::design_sections(cutoff, sampling_rate, filter_config.order, true)?
            }
            FilterType::ButterworthBandpass => {
                let (low, high) = match (filter_config.low_cutoff, filter_config.high_cutoff) {
                    (Some(low), Some(high)) => (low, high),
                    _ => {
                        return Err(CbError::config(
                            "Bandpass filter requires low and high cutoff frequencies",
                        ))
                    }
                };
                if low >= high {
                    return Err(CbError::config("Low cutoff must be less than high cutoff"));
                }
                // Band edges are realized as cascaded highpass and lowpass sections
                let mut sections = Self::design_sections(low, sampling_rate, filter_config.order, true)?;
                sections.extend(Self::design_sections(high, sampling_rate, filter_config.order, false)?);
                sections
            }
            FilterType::Notch => {
                return Err(CbError::config("Unsupported filter type for Butterworth filter"));
            }
        };

        Ok(ButterworthFilter {
            cascade: SosCascade { sections },
        })
    }

    /// Bilinear-transform design with frequency pre-warping
    fn design_sections(cutoff: f64, fs: f64, order: usize, highpass: bool) -> CbResult<Vec<BiquadSection>> {
        if !(cutoff > 0.0) || cutoff >= fs / 2.0 {
            return Err(CbError::config(format!(
                "Cutoff frequency {}Hz must lie in (0, {}Hz)",
                cutoff,
                fs / 2.0
            )));
        }

        let k = (PI * cutoff / fs).tan();
        let k2 = k * k;
        let mut sections = Vec::with_capacity((order + 1) / 2);

        for pair in 0..order / 2 {
            // s^2 + alpha*s + 1 for each conjugate pole pair
            let alpha = 2.0 * (PI * (2 * pair + 1) as f64 / (2 * order) as f64).sin();
            let norm = 1.0 / (k2 + alpha * k + 1.0);
            let (b0, b1, b2) = if highpass {
                (norm, -2.0 * norm, norm)
            } else {
                (k2 * norm, 2.0 * k2 * norm, k2 * norm)
            };
            sections.push(BiquadSection {
                b0, b1, b2,
                a1: 2.0 * (k2 - 1.0) * norm,
                a2: (k2 - alpha * k + 1.0) * norm,
            });
        }

        if order % 2 == 1 {
            let norm = 1.0 / (k + 1.0);
            let (b0, b1) = if highpass { (norm, -norm) } else { (k * norm, k * norm) };
            sections.push(BiquadSection {
                b0, b1, b2: 0.0,
                a1: (k - 1.0) * norm,
                a2: 0.0,
            });
        }

        Ok(sections)
    }
}

impl SignalFilter for ButterworthFilter {
    fn process(&self, input: &[f64]) -> Vec<f64> {
        self.cascade.filtfilt(input)
    }

    fn name(&self) -> &str {
        "Butterworth Filter"
    }
}

/// Notch filter for powerline interference removal
pub struct NotchFilter {
    cascade: SosCascade,
}

impl NotchFilter {
    /// Create new notch filter
    pub fn new(notch_freq: f64, q_factor: f64, sampling_rate: f64) -> CbResult<Self> {
        if !(notch_freq > 0.0) || notch_freq >= sampling_rate / 2.0 {
            return Err(CbError::config(format!(
                "Notch frequency {}Hz must lie below Nyquist ({}Hz)",
                notch_freq,
                sampling_rate / 2.0
            )));
        }
        if !(q_factor > 0.0) {
            return Err(CbError::config("Notch quality factor must be positive"));
        }

        let omega = 2.0 * PI * notch_freq / sampling_rate;
        let alpha = omega.sin() / (2.0 * q_factor);
        let cos_omega = omega.cos();
        let a0 = 1.0 + alpha;

        let section = BiquadSection {
            b0: 1.0 / a0,
            b1: -2.0 * cos_omega / a0,
            b2: 1.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        };

        Ok(NotchFilter {
            cascade: SosCascade { sections: vec![section] },
        })
    }
}

impl SignalFilter for NotchFilter {
    fn process(&self, input: &[f64]) -> Vec<f64> {
        self.cascade.filtfilt(input)
    }

    fn name(&self) -> &str {
        "Notch Filter"
    }
}

/// Filter bank for combining multiple filters
pub struct FilterBank {
    filters: Vec<Box<dyn SignalFilter>>,
}

impl FilterBank {
    /// Create new filter bank
    pub fn new() -> Self {
        FilterBank { filters: Vec::new() }
    }

    /// Add a filter to the bank
    pub fn add_filter(&mut self, filter: Box<dyn SignalFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Apply filters sequentially
    pub fn process(&self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for filter in &self.filters {
            current = filter.process(&current);
        }
        current
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.name().to_string()).collect()
    }
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn test_butterworth_lowpass() {
        let filter = ButterworthFilter::new(FilterConfig::lowpass(20.0, 4), 1000.0).unwrap();

        let passband = filter.process(&sine(5.0, 1000.0, 2000));
        let stopband = filter.process(&sine(200.0, 1000.0, 2000));

        assert_eq!(passband.len(), 2000);
        assert!(rms(&passband[500..1500]) > 0.65);
        assert!(rms(&stopband[500..1500]) < 0.01);
    }

    #[test]
    fn test_highpass_removes_offset() {
        let filter = ButterworthFilter::new(FilterConfig::highpass(0.5, 5), 1000.0).unwrap();
        let input: Vec<f64> = sine(10.0, 1000.0, 10_000).iter().map(|x| x + 3.0).collect();

        let output = filter.process(&input);
        let middle = &output[4000..6000];
        let mean = middle.iter().sum::<f64>() / middle.len() as f64;

        assert!(mean.abs() < 0.05);
        assert!((rms(middle) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.05);
    }

    #[test]
    fn test_constant_input_settles_immediately() {
        let filter = ButterworthFilter::new(FilterConfig::lowpass(40.0, 2), 250.0).unwrap();
        let output = filter.process(&vec![2.5; 300]);
        assert!(output.iter().all(|x| (x - 2.5).abs() < 1e-9));
    }

    #[test]
    fn test_zero_phase_keeps_peak_position() {
        let mut input = vec![0.0; 1001];
        for (i, x) in input.iter_mut().enumerate() {
            let t = (i as f64 - 500.0) / 20.0;
            *x = (-t * t).exp();
        }
        let filter = ButterworthFilter::new(FilterConfig::lowpass(30.0, 4), 1000.0).unwrap();
        let output = filter.process(&input);

        let peak = output
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((peak as i64 - 500).abs() <= 1);
    }

    #[test]
    fn test_bandpass() {
        let filter = ButterworthFilter::new(FilterConfig::bandpass(0.5, 45.0, 2), 250.0).unwrap();
        let passband = filter.process(&sine(10.0, 250.0, 2500));
        let stopband = filter.process(&sine(110.0, 250.0, 2500));

        assert!(rms(&passband[500..2000]) > 0.65);
        assert!(rms(&stopband[500..2000]) < 0.05);
    }

    #[test]
    fn test_notch_filter() {
        let fs = 1000.0;
        let wanted = sine(10.0, fs, 4000);
        let interference = sine(50.0, fs, 4000);
        let input: Vec<f64> = wanted.iter().zip(&interference).map(|(a, b)| a + 0.5 * b).collect();

        let filter = NotchFilter::new(50.0, 30.0, fs).unwrap();
        let output = filter.process(&input);

        let residual: Vec<f64> = output.iter().zip(&wanted).map(|(a, b)| a - b).collect();
        assert!(rms(&residual[1000..3000]) < 0.05);
    }

    #[test]
    fn test_invalid_cutoff() {
        assert!(ButterworthFilter::new(FilterConfig::lowpass(600.0, 2), 1000.0).is_err());
        assert!(ButterworthFilter::new(FilterConfig::highpass(0.0, 2), 1000.0).is_err());
        assert!(ButterworthFilter::new(FilterConfig::bandpass(40.0, 10.0, 2), 1000.0).is_err());
        assert!(ButterworthFilter::new(FilterConfig::lowpass(10.0, 0), 1000.0).is_err());
        assert!(NotchFilter::new(60.0, 30.0, 100.0).is_err());
    }

    #[test]
    fn test_short_input() {
        let filter = ButterworthFilter::new(FilterConfig::highpass(0.5, 5), 1000.0).unwrap();
        assert_eq!(filter.process(&[1.0]).len(), 1);
        assert_eq!(filter.process(&[1.0, 2.0, 3.0]).len(), 3);
        assert!(filter.process(&[]).is_empty());
    }

    #[test]
    fn test_filter_bank() {
        let mut bank = FilterBank::new();
        bank.add_filter(FilterConfig::highpass(0.5, 2).build(500.0).unwrap());
        bank.add_filter(FilterConfig::notch(50.0, 30.0).build(500.0).unwrap());

        assert_eq!(bank.len(), 2);
        assert_eq!(bank.filter_names(), vec!["Butterworth Filter", "Notch Filter"]);
        assert_eq!(bank.process(&sine(5.0, 500.0, 1000)).len(), 1000);
    }
}
