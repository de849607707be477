//! Welch spectral estimation
//!
//! Power and cross spectral densities are averaged over Hann-windowed,
//! half-overlapping segments. Each segment has its mean removed before the
//! window is applied, and the result is scaled as a one-sided density in
//! units²/Hz.

use cardiobrain_core::{CbError, CbResult};
use num_complex::Complex;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One-sided spectrum sampled at `freqs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub freqs: Vec<f64>,
    pub psd: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Spacing between adjacent bins
    pub fn resolution(&self) -> f64 {
        match self.freqs.as_slice() {
            [a, b, ..] => b - a,
            _ => 0.0,
        }
    }

    /// Sum of all bins
    pub fn total_power(&self) -> f64 {
        self.psd.iter().sum()
    }

    /// Sum of the bins whose frequency lies in `[low, high)`, or `[low, high]` when
    /// `include_high` is set
    pub fn band_sum(&self, low: f64, high: f64, include_high: bool) -> f64 {
        self.freqs
            .iter()
            .zip(&self.psd)
            .filter(|(&f, _)| f >= low && (f < high || (include_high && f <= high)))
            .map(|(_, &p)| p)
            .sum()
    }

    /// Trapezoidal integral of the density over the bins in `[low, high]`
    pub fn band_integral(&self, low: f64, high: f64) -> f64 {
        let points: Vec<(f64, f64)> = self
            .freqs
            .iter()
            .zip(&self.psd)
            .filter(|(&f, _)| f >= low && f <= high)
            .map(|(&f, &p)| (f, p))
            .collect();

        points
            .windows(2)
            .map(|w| 0.5 * (w[0].1 + w[1].1) * (w[1].0 - w[0].0))
            .sum()
    }
}

/// Complex cross spectrum sampled at `freqs`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossSpectrum {
    pub freqs: Vec<f64>,
    pub values: Vec<Complex<f64>>,
}

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Frequencies of the one-sided spectrum of an `n`-point transform
pub fn rfft_frequencies(n: usize, sampling_rate: f64) -> Vec<f64> {
    (0..=n / 2).map(|k| k as f64 * sampling_rate / n as f64).collect()
}

/// Segment layout shared by the Welch estimators
struct Segmentation {
    nperseg: usize,
    step: usize,
    count: usize,
}

impl Segmentation {
    fn new(len: usize, nperseg: usize) -> CbResult<Self> {
        if len == 0 {
            return Err(CbError::insufficient("cannot estimate spectrum of an empty signal"));
        }
        let nperseg = nperseg.min(len);
        if nperseg == 0 {
            return Err(CbError::insufficient("segment length must be at least one sample"));
        }
        let step = (nperseg - nperseg / 2).max(1);
        let count = (len - nperseg) / step + 1;
        Ok(Self { nperseg, step, count })
    }
}

/// Windowed, mean-removed FFT of every segment of `data`
fn segment_spectra(data: &[f64], seg: &Segmentation, window: &[f64]) -> CbResult<Vec<Vec<Complex<f64>>>> {
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(seg.nperseg);
    let mut buffer = r2c.make_input_vec();

    let mut spectra = Vec::with_capacity(seg.count);
    for s in 0..seg.count {
        let start = s * seg.step;
        let segment = &data[start..start + seg.nperseg];
        let mean = segment.iter().sum::<f64>() / seg.nperseg as f64;

        for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(window) {
            *slot = (x - mean) * w;
        }

        let mut output = r2c.make_output_vec();
        r2c.process(&mut buffer, &mut output)
            .map_err(|e| CbError::processing(format!("FFT failed: {}", e)))?;
        spectra.push(output);
    }

    Ok(spectra)
}

/// Density scale and one-sided doubling for bin `k` of an `n`-point transform
fn one_sided_scale(k: usize, n: usize, base: f64) -> f64 {
    let is_nyquist = n % 2 == 0 && k == n / 2;
    if k == 0 || is_nyquist {
        base
    } else {
        2.0 * base
    }
}

fn validate_rate(sampling_rate: f64) -> CbResult<()> {
    if sampling_rate.is_finite() && sampling_rate > 0.0 {
        Ok(())
    } else {
        Err(CbError::InvalidSamplingRate {
            rate: sampling_rate,
            reason: "spectral estimation needs a positive rate".to_string(),
        })
    }
}

/// Welch power spectral density with `nperseg`-sample segments
///
/// `nperseg` is reduced to the signal length when the signal is shorter.
pub fn welch(data: &[f64], sampling_rate: f64, nperseg: usize) -> CbResult<Spectrum> {
    validate_rate(sampling_rate)?;
    let seg = Segmentation::new(data.len(), nperseg)?;
    let window = hann_window(seg.nperseg);
    let base = 1.0 / (sampling_rate * window.iter().map(|w| w * w).sum::<f64>());

    let spectra = segment_spectra(data, &seg, &window)?;
    let bins = seg.nperseg / 2 + 1;
    let mut psd = vec![0.0; bins];
    for spectrum in &spectra {
        for (k, value) in spectrum.iter().enumerate() {
            psd[k] += value.norm_sqr() * one_sided_scale(k, seg.nperseg, base);
        }
    }
    for p in psd.iter_mut() {
        *p /= seg.count as f64;
    }

    Ok(Spectrum {
        freqs: rfft_frequencies(seg.nperseg, sampling_rate),
        psd,
    })
}

/// Welch cross spectral density `conj(X)·Y`
pub fn csd(x: &[f64], y: &[f64], sampling_rate: f64, nperseg: usize) -> CbResult<CrossSpectrum> {
    validate_rate(sampling_rate)?;
    if x.len() != y.len() {
        return Err(CbError::InvalidSignalData {
            reason: format!("cross spectrum needs equal lengths, got {} and {}", x.len(), y.len()),
        });
    }

    let seg = Segmentation::new(x.len(), nperseg)?;
    let window = hann_window(seg.nperseg);
    let base = 1.0 / (sampling_rate * window.iter().map(|w| w * w).sum::<f64>());

    let sx = segment_spectra(x, &seg, &window)?;
    let sy = segment_spectra(y, &seg, &window)?;
    let bins = seg.nperseg / 2 + 1;
    let mut values = vec![Complex::new(0.0, 0.0); bins];
    for (a, b) in sx.iter().zip(&sy) {
        for k in 0..bins {
            values[k] += a[k].conj() * b[k] * one_sided_scale(k, seg.nperseg, base);
        }
    }
    for v in values.iter_mut() {
        *v /= seg.count as f64;
    }

    Ok(CrossSpectrum {
        freqs: rfft_frequencies(seg.nperseg, sampling_rate),
        values,
    })
}

/// Magnitude-squared coherence `|Pxy|² / (Pxx·Pyy)`
///
/// Bins where either auto spectrum vanishes report 0.
pub fn coherence(x: &[f64], y: &[f64], sampling_rate: f64, nperseg: usize) -> CbResult<Spectrum> {
    let pxy = csd(x, y, sampling_rate, nperseg)?;
    let pxx = welch(x, sampling_rate, nperseg)?;
    let pyy = welch(y, sampling_rate, nperseg)?;

    let values = pxy
        .values
        .iter()
        .zip(pxx.psd.iter().zip(&pyy.psd))
        .map(|(cross, (&a, &b))| {
            let denom = a * b;
            if denom > f64::MIN_POSITIVE {
                (cross.norm_sqr() / denom).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect();

    Ok(Spectrum { freqs: pxy.freqs, psd: values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    #[test]
    fn test_hann_window() {
        let w = hann_window(4);
        assert_eq!(w.len(), 4);
        assert!(w[0].abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn test_welch_peak_frequency() {
        let fs = 250.0;
        let spectrum = welch(&sine(10.0, fs, 2500), fs, 250).unwrap();

        assert_eq!(spectrum.len(), 126);
        assert!((spectrum.resolution() - 1.0).abs() < 1e-12);

        let peak = spectrum
            .psd
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| spectrum.freqs[i])
            .unwrap();
        assert!((peak - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_welch_parseval() {
        // Integrated density of a unit sine is its variance, 0.5
        let fs = 100.0;
        let spectrum = welch(&sine(12.5, fs, 4000), fs, 200).unwrap();
        let power = spectrum.total_power() * spectrum.resolution();
        assert!((power - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_welch_constant_signal_is_zero() {
        let spectrum = welch(&vec![3.0; 500], 100.0, 100).unwrap();
        assert!(spectrum.psd.iter().all(|&p| p.abs() < 1e-20));
    }

    #[test]
    fn test_welch_short_signal_shrinks_segment() {
        let spectrum = welch(&[1.0, -1.0, 1.0, -1.0], 10.0, 256).unwrap();
        assert_eq!(spectrum.freqs, vec![0.0, 2.5, 5.0]);
    }

    #[test]
    fn test_welch_rejects_empty() {
        assert!(welch(&[], 100.0, 64).is_err());
        assert!(welch(&[1.0], 0.0, 64).is_err());
    }

    #[test]
    fn test_band_helpers() {
        let spectrum = Spectrum {
            freqs: vec![0.0, 1.0, 2.0, 3.0, 4.0],
            psd: vec![1.0, 2.0, 2.0, 2.0, 1.0],
        };
        assert_eq!(spectrum.band_sum(1.0, 3.0, false), 4.0);
        assert_eq!(spectrum.band_sum(1.0, 3.0, true), 6.0);
        assert_eq!(spectrum.band_integral(1.0, 3.0), 4.0);
        assert_eq!(spectrum.band_integral(10.0, 20.0), 0.0);
    }

    #[test]
    fn test_coherence_identical_signals() {
        let fs = 100.0;
        let x: Vec<f64> = (0..2000)
            .map(|i| (i as f64 * 0.37).sin() + (i as f64 * 1.1).cos())
            .collect();
        let coh = coherence(&x, &x, fs, 100).unwrap();
        for (&f, &c) in coh.freqs.iter().zip(&coh.psd) {
            if f > 0.0 && f < 50.0 {
                assert!((c - 1.0).abs() < 1e-6 || c == 0.0);
            }
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_coherence_length_mismatch() {
        assert!(coherence(&[1.0, 2.0], &[1.0], 10.0, 2).is_err());
    }
}
