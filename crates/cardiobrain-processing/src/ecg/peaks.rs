//! R-peak detection
//!
//! QRS complexes are emphasised with a zero-phase band-pass, a five-point
//! derivative, squaring and a short centered moving integration. Local maxima
//! of that envelope above a fraction of its 98th percentile are accepted
//! greedily by height with a refractory distance, then each is moved to the
//! largest cleaned-signal sample nearby.

use crate::config::EcgConfig;
use crate::filters::{ButterworthFilter, FilterConfig, SignalFilter};
use crate::stats;
use cardiobrain_core::{CbError, CbResult};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// QRS-envelope R-peak detector
#[derive(Debug, Clone)]
pub struct RPeakDetector {
    qrs_band: (f64, f64),
    qrs_order: usize,
    integration_window: f64,
    refractory_period: f64,
    threshold_ratio: f64,
    refine_window: f64,
}

impl RPeakDetector {
    pub fn new(config: &EcgConfig) -> Self {
        Self {
            qrs_band: config.qrs_band,
            qrs_order: config.qrs_order,
            integration_window: config.integration_window,
            refractory_period: config.refractory_period,
            threshold_ratio: config.threshold_ratio,
            refine_window: config.refine_window,
        }
    }

    /// R-peak sample indices into `cleaned`, strictly increasing
    ///
    /// A flat signal yields no peaks rather than an error.
    pub fn detect(&self, cleaned: &[f64], sampling_rate: f64) -> CbResult<Vec<usize>> {
        if cleaned.len() < 3 {
            return Err(CbError::insufficient(format!(
                "R-peak detection needs at least 3 samples, got {}",
                cleaned.len()
            )));
        }

        let (min, max) = cleaned
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
        if max - min <= 1e-12 * max.abs().max(min.abs()).max(1.0) {
            debug!("ECG is flat, no R-peaks");
            return Ok(Vec::new());
        }

        let envelope = self.qrs_envelope(cleaned, sampling_rate)?;
        let threshold = self.threshold_ratio * stats::percentile(&envelope, 98.0)?;
        if !(threshold > f64::MIN_POSITIVE) {
            debug!("QRS envelope is flat, no R-peaks");
            return Ok(Vec::new());
        }

        let distance = ((self.refractory_period * sampling_rate).ceil() as usize).max(1);
        let candidates = local_maxima(&envelope, threshold);
        let selected = select_by_distance(&envelope, candidates, distance);

        let radius = (self.refine_window * sampling_rate).round() as usize;
        let mut peaks: Vec<usize> = selected
            .into_iter()
            .map(|p| refine(cleaned, p, radius))
            .collect();
        peaks.sort_unstable();
        peaks.dedup();

        debug!("Detected {} R-peaks (threshold {:.3e})", peaks.len(), threshold);
        Ok(peaks)
    }

    /// Integrated squared slope of the QRS band
    fn qrs_envelope(&self, cleaned: &[f64], fs: f64) -> CbResult<Vec<f64>> {
        let (low, mut high) = self.qrs_band;
        if high >= fs / 2.0 {
            high = 0.45 * fs;
            warn!("QRS band edge clamped to {:.1}Hz at {}Hz sampling", high, fs);
        }
        if low >= high {
            return Err(CbError::InvalidSamplingRate {
                rate: fs,
                reason: format!("too low to resolve the {}Hz QRS band", low),
            });
        }

        let filter = ButterworthFilter::new(FilterConfig::bandpass(low, high, self.qrs_order), fs)?;
        let band = filter.process(cleaned);

        let slope = five_point_derivative(&band, fs);
        let squared: Vec<f64> = slope.iter().map(|d| d * d).collect();
        let window = ((self.integration_window * fs).round() as usize).max(1);
        Ok(moving_average(&squared, window))
    }
}

/// Centered five-point derivative; the two samples at each edge are zero
fn five_point_derivative(data: &[f64], fs: f64) -> Vec<f64> {
    let n = data.len();
    let mut out = vec![0.0; n];
    for i in 2..n.saturating_sub(2) {
        out[i] = (2.0 * data[i + 2] + data[i + 1] - data[i - 1] - 2.0 * data[i - 2]) * fs / 8.0;
    }
    out
}

/// Centered moving average over `window` samples, shrinking at the edges
fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    let n = data.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for x in data {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + x);
    }

    let half = window / 2;
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + window - half).min(n);
            (prefix[end] - prefix[start]) / (end - start) as f64
        })
        .collect()
}

/// Indices of local maxima at or above `threshold`; plateaus report their first sample
fn local_maxima(data: &[f64], threshold: f64) -> Vec<usize> {
    let mut peaks = Vec::new();
    let n = data.len();
    let mut i = 1;
    while i + 1 < n {
        if data[i] > data[i - 1] && data[i] >= threshold {
            let mut j = i;
            while j + 1 < n && data[j + 1] == data[i] {
                j += 1;
            }
            if j + 1 < n && data[j + 1] < data[i] {
                peaks.push(i);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    peaks
}

/// Keep the highest peaks, discarding any closer than `distance` to an already kept one
fn select_by_distance(data: &[f64], candidates: Vec<usize>, distance: usize) -> Vec<usize> {
    let mut by_height = candidates;
    by_height.sort_by(|&a, &b| data[b].total_cmp(&data[a]).then(a.cmp(&b)));

    let reach = distance.saturating_sub(1);
    let mut kept = BTreeSet::new();
    for p in by_height {
        if kept.range(p.saturating_sub(reach)..=p.saturating_add(reach)).next().is_none() {
            kept.insert(p);
        }
    }
    kept.into_iter().collect()
}

/// Index of the largest sample within `radius` of `center`
fn refine(data: &[f64], center: usize, radius: usize) -> usize {
    let start = center.saturating_sub(radius);
    let end = (center + radius + 1).min(data.len());
    let mut best = center.min(data.len() - 1);
    for i in start..end {
        if data[i] > data[best] {
            best = i;
        }
    }
    best
}
