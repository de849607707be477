//! Band-limited resampling and two-signal alignment

use cardiobrain_core::{CbError, CbResult};
use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

/// Resample `data` to `new_len` samples by Fourier interpolation
///
/// The spectrum is truncated or zero-padded around the Nyquist bin, which is
/// split between both halves when the shorter length is even.
pub fn resample(data: &[f64], new_len: usize) -> CbResult<Vec<f64>> {
    let n = data.len();
    if n == 0 || new_len == 0 {
        return Err(CbError::insufficient(format!(
            "cannot resample {} samples to {}",
            n, new_len
        )));
    }
    if n == new_len {
        return Ok(data.to_vec());
    }

    let mut planner = FftPlanner::<f64>::new();
    let mut spectrum: Vec<Complex<f64>> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut spectrum);

    let shared = n.min(new_len);
    let nyq = shared / 2 + 1;
    let mut resized = vec![Complex::new(0.0, 0.0); new_len];
    resized[..nyq].copy_from_slice(&spectrum[..nyq]);
    let tail = shared - nyq;
    resized[new_len - tail..].copy_from_slice(&spectrum[n - tail..]);

    if shared % 2 == 0 {
        let half = shared / 2;
        if new_len < n {
            // Fold the discarded negative Nyquist component back in
            resized[half] += spectrum[n - half];
        } else {
            resized[half] *= 0.5;
            resized[new_len - half] = resized[half];
        }
    }

    planner.plan_fft_inverse(new_len).process(&mut resized);
    let scale = 1.0 / n as f64;
    Ok(resized.iter().map(|c| c.re * scale).collect())
}

/// Length of a recording of `len` samples at `from` Hz once resampled to `to` Hz
pub fn resampled_length(len: usize, from: f64, to: f64) -> usize {
    (len as f64 * to / from).round() as usize
}

/// Two signals brought to a common rate and length
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub first: Vec<f64>,
    pub second: Vec<f64>,
    pub sampling_rate: f64,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sampling_rate
    }
}

fn to_rate(data: &[f64], from: f64, target: f64) -> CbResult<Vec<f64>> {
    if from == target {
        return Ok(data.to_vec());
    }
    resample(data, resampled_length(data.len(), from, target))
}

/// Resample both signals to the higher of the two rates and truncate to the shorter length
pub fn align(first: &[f64], first_rate: f64, second: &[f64], second_rate: f64) -> CbResult<AlignedPair> {
    for rate in [first_rate, second_rate] {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(CbError::InvalidSamplingRate {
                rate,
                reason: "alignment needs positive sampling rates".to_string(),
            });
        }
    }

    let target = first_rate.max(second_rate);
    let mut a = to_rate(first, first_rate, target)?;
    let mut b = to_rate(second, second_rate, target)?;

    let len = a.len().min(b.len());
    if len == 0 {
        return Err(CbError::insufficient("aligned signals would be empty"));
    }
    a.truncate(len);
    b.truncate(len);

    debug!(
        "Aligned signals at {} Hz: {} samples ({} Hz, {} Hz inputs)",
        target, len, first_rate, second_rate
    );

    Ok(AlignedPair {
        first: a,
        second: b,
        sampling_rate: target,
    })
}
