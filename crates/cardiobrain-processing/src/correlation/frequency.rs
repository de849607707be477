//! Frequency-domain coupling: coherence and phase locking

use crate::estimator::Estimator;
use crate::spectral::{self, hann_window};
use cardiobrain_core::{CbError, CbResult};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Bands averaged in the coherence summary, edges inclusive
pub const COHERENCE_BANDS: [(&str, f64, f64); 4] = [
    ("delta", 0.5, 4.0),
    ("theta", 4.0, 8.0),
    ("alpha", 8.0, 13.0),
    ("beta", 13.0, 30.0),
];

/// Magnitude-squared coherence spectrum and its band means
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoherenceSummary {
    pub frequencies: Vec<f64>,
    pub values: Vec<f64>,
    pub delta_band: f64,
    pub theta_band: f64,
    pub alpha_band: f64,
    pub beta_band: f64,
}

/// Mean of `values` at frequencies in `[low, high]`; 0 when no bin falls inside
fn band_mean(freqs: &[f64], values: &[f64], low: f64, high: f64) -> f64 {
    let selected: Vec<f64> = freqs
        .iter()
        .zip(values)
        .filter(|(&f, _)| f >= low && f <= high)
        .map(|(_, &v)| v)
        .collect();
    if selected.is_empty() {
        0.0
    } else {
        selected.iter().sum::<f64>() / selected.len() as f64
    }
}

/// Coherence with segments of one second or half the recording, whichever is shorter
pub fn coherence_summary(a: &[f64], b: &[f64], sampling_rate: f64) -> CbResult<CoherenceSummary> {
    let nperseg = (sampling_rate.round() as usize).min(a.len() / 2);
    if nperseg < 2 {
        return Err(CbError::insufficient(format!(
            "coherence needs at least 4 samples, got {}",
            a.len()
        )));
    }

    let coh = spectral::coherence(a, b, sampling_rate, nperseg)?;
    let mean = |i: usize| {
        let (_, low, high) = COHERENCE_BANDS[i];
        band_mean(&coh.freqs, &coh.psd, low, high)
    };

    Ok(CoherenceSummary {
        delta_band: mean(0),
        theta_band: mean(1),
        alpha_band: mean(2),
        beta_band: mean(3),
        frequencies: coh.freqs,
        values: coh.psd,
    })
}

/// Whether the phase-locking value was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseLockingStatus {
    Computed,
    SkippedInsufficientDuration,
    Failed,
}

/// Two aligned signals and the band over which phase locking is measured
#[derive(Debug, Clone, Copy)]
pub struct PhasePair<'a> {
    pub a: &'a [f64],
    pub b: &'a [f64],
    pub sampling_rate: f64,
    pub min_freq: f64,
    pub max_freq: f64,
}

impl PhasePair<'_> {
    fn check(&self) -> CbResult<()> {
        if self.a.len() != self.b.len() || self.a.is_empty() {
            return Err(CbError::InvalidSignalData {
                reason: format!(
                    "phase locking needs equal non-empty lengths, got {} and {}",
                    self.a.len(),
                    self.b.len()
                ),
            });
        }
        if !(self.min_freq < self.max_freq) {
            return Err(CbError::insufficient(format!(
                "empty phase-locking band {}..{}Hz",
                self.min_freq, self.max_freq
            )));
        }
        Ok(())
    }

    fn in_band(&self, freq: f64) -> bool {
        freq >= self.min_freq && freq <= self.max_freq
    }
}

/// Phase consistency of the cross spectrum across half-overlapping Hann windows
///
/// Per-bin locking values are averaged over the band, weighted by the mean
/// cross-spectral magnitude of each bin.
pub struct WindowedPlv {
    pub window_seconds: f64,
}

impl<'a> Estimator<PhasePair<'a>> for WindowedPlv {
    type Output = f64;

    fn name(&self) -> &'static str {
        "windowed cross-spectral PLV"
    }

    fn estimate(&self, pair: &PhasePair<'a>) -> CbResult<f64> {
        pair.check()?;
        let n = pair.a.len();
        let window_len = (self.window_seconds * pair.sampling_rate).round() as usize;
        if window_len < 2 {
            return Err(CbError::insufficient("PLV window shorter than 2 samples"));
        }
        let step = (window_len / 2).max(1);
        if n < window_len + step {
            return Err(CbError::insufficient(format!(
                "PLV needs at least two windows of {} samples, got {} samples",
                window_len, n
            )));
        }
        let windows = (n - window_len) / step + 1;

        let taper = hann_window(window_len);
        let freqs = spectral::rfft_frequencies(window_len, pair.sampling_rate);
        let bins: Vec<usize> = (0..freqs.len()).filter(|&k| pair.in_band(freqs[k])).collect();
        if bins.is_empty() {
            return Err(CbError::insufficient("no frequency bins inside the PLV band"));
        }

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(window_len);
        let transform = |segment: &[f64]| {
            let mean = segment.iter().sum::<f64>() / segment.len() as f64;
            let mut buf: Vec<Complex<f64>> = segment
                .iter()
                .zip(&taper)
                .map(|(&x, &w)| Complex::new((x - mean) * w, 0.0))
                .collect();
            fft.process(&mut buf);
            buf
        };

        let mut phasors = vec![Complex::new(0.0, 0.0); bins.len()];
        let mut magnitudes = vec![0.0; bins.len()];
        let mut counts = vec![0usize; bins.len()];
        for w in 0..windows {
            let start = w * step;
            let xa = transform(&pair.a[start..start + window_len]);
            let xb = transform(&pair.b[start..start + window_len]);
            for (slot, &k) in bins.iter().enumerate() {
                let cross = xa[k] * xb[k].conj();
                let magnitude = cross.norm();
                if magnitude > f64::MIN_POSITIVE {
                    phasors[slot] += cross / magnitude;
                    magnitudes[slot] += magnitude;
                    counts[slot] += 1;
                }
            }
        }

        let (mut weighted, mut total_weight) = (0.0, 0.0);
        for slot in 0..bins.len() {
            if counts[slot] < 2 {
                continue;
            }
            let count = counts[slot] as f64;
            let weight = magnitudes[slot] / count;
            weighted += weight * phasors[slot].norm() / count;
            total_weight += weight;
        }
        if !(total_weight > 0.0) {
            return Err(CbError::degenerate("no band power in enough windows to measure phase"));
        }
        Ok((weighted / total_weight).clamp(0.0, 1.0))
    }
}

/// Phase locking of the band-limited analytic signals over the whole recording
pub struct HilbertPlv;

impl HilbertPlv {
    /// Analytic signal restricted to the band: negative and out-of-band bins removed
    fn analytic(data: &[f64], pair: &PhasePair<'_>, planner: &mut FftPlanner<f64>) -> Vec<Complex<f64>> {
        let n = data.len();
        let mut spectrum: Vec<Complex<f64>> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
        planner.plan_fft_forward(n).process(&mut spectrum);

        for (k, bin) in spectrum.iter_mut().enumerate() {
            let freq = k as f64 * pair.sampling_rate / n as f64;
            let positive = k > 0 && 2 * k < n;
            if positive && pair.in_band(freq) {
                *bin *= 2.0;
            } else {
                *bin = Complex::new(0.0, 0.0);
            }
        }

        planner.plan_fft_inverse(n).process(&mut spectrum);
        let scale = 1.0 / n as f64;
        spectrum.iter().map(|c| c * scale).collect()
    }
}

impl<'a> Estimator<PhasePair<'a>> for HilbertPlv {
    type Output = f64;

    fn name(&self) -> &'static str {
        "analytic-signal PLV"
    }

    fn estimate(&self, pair: &PhasePair<'a>) -> CbResult<f64> {
        pair.check()?;
        let mut planner = FftPlanner::<f64>::new();
        let za = Self::analytic(pair.a, pair, &mut planner);
        let zb = Self::analytic(pair.b, pair, &mut planner);

        let peak = za.iter().chain(&zb).map(|z| z.norm()).fold(0.0, f64::max);
        let floor = peak * 1e-9;

        let mut sum = Complex::new(0.0, 0.0);
        let mut count = 0usize;
        for (x, y) in za.iter().zip(&zb) {
            let cross = x * y.conj();
            let magnitude = cross.norm();
            if x.norm() > floor && y.norm() > floor && magnitude > f64::MIN_POSITIVE {
                sum += cross / magnitude;
                count += 1;
            }
        }

        if count == 0 {
            return Err(CbError::degenerate("no in-band activity to measure phase"));
        }
        Ok((sum.norm() / count as f64).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::WithFallback;
    use std::f64::consts::PI;

    fn sine(freq: f64, phase: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs + phase).sin()).collect()
    }

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    fn pair<'a>(a: &'a [f64], b: &'a [f64], fs: f64) -> PhasePair<'a> {
        PhasePair { a, b, sampling_rate: fs, min_freq: 2.0, max_freq: 45.0 }
    }

    #[test]
    fn test_band_mean() {
        let freqs = [0.0, 2.0, 4.0, 6.0];
        let values = [1.0, 0.5, 0.3, 0.1];
        assert!((band_mean(&freqs, &values, 2.0, 4.0) - 0.4).abs() < 1e-12);
        assert_eq!(band_mean(&freqs, &values, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_coherence_summary_identical() {
        let a: Vec<f64> = noise(5000, 7);
        let summary = coherence_summary(&a, &a, 250.0).unwrap();

        assert_eq!(summary.frequencies.len(), summary.values.len());
        assert!((summary.alpha_band - 1.0).abs() < 1e-6);
        assert!((summary.beta_band - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_coherence_summary_too_short() {
        assert!(coherence_summary(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 250.0).is_err());
    }

    #[test]
    fn test_phase_locked_sines() {
        let fs = 250.0;
        let a = sine(10.0, 0.0, fs, 3000);
        let b = sine(10.0, 1.0, fs, 3000);
        let input = pair(&a, &b, fs);

        assert!(WindowedPlv { window_seconds: 1.0 }.estimate(&input).unwrap() > 0.9);
        assert!(HilbertPlv.estimate(&input).unwrap() > 0.9);
    }

    #[test]
    fn test_independent_noise_has_low_plv() {
        let fs = 250.0;
        let a = noise(7500, 1);
        let b = noise(7500, 2);
        let input = pair(&a, &b, fs);

        let windowed = WindowedPlv { window_seconds: 1.0 }.estimate(&input).unwrap();
        let hilbert = HilbertPlv.estimate(&input).unwrap();
        assert!(windowed < 0.5);
        assert!(hilbert < 0.2);
    }

    #[test]
    fn test_windowed_needs_two_windows() {
        let a = sine(10.0, 0.0, 250.0, 300);
        let input = pair(&a, &a, 250.0);
        assert!(WindowedPlv { window_seconds: 1.0 }.estimate(&input).is_err());
        assert!(HilbertPlv.estimate(&input).is_ok());
    }

    #[test]
    fn test_zero_signals_fail_both() {
        let a = vec![0.0; 5000];
        let input = pair(&a, &a, 250.0);
        let plv = WithFallback::new(WindowedPlv { window_seconds: 1.0 }, HilbertPlv);
        assert!(plv.estimate(&input).is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&PhaseLockingStatus::SkippedInsufficientDuration).unwrap();
        assert_eq!(json, "\"skipped_insufficient_duration\"");
    }
}
