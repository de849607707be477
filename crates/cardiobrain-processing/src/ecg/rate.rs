//! Instantaneous heart rate and interval-related statistics

use crate::estimator::Estimator;
use cardiobrain_core::{CbError, CbResult};

/// Heart rate (BPM) per sample, linearly interpolated between R-peaks
///
/// The first beat has no preceding interval and takes the mean of the
/// others. Values are held constant before the first and after the last
/// peak. Fewer than two peaks gives an empty sequence.
pub fn instantaneous_rate(r_peaks: &[usize], sampling_rate: f64, len: usize) -> Vec<f64> {
    if r_peaks.len() < 2 || len == 0 {
        return Vec::new();
    }

    let periods: Vec<f64> = r_peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 / sampling_rate)
        .collect();
    let first = periods.iter().sum::<f64>() / periods.len() as f64;
    let rates: Vec<f64> = std::iter::once(first)
        .chain(periods)
        .map(|period| 60.0 / period)
        .collect();

    let mut out = Vec::with_capacity(len);
    let mut seg = 0;
    for i in 0..len {
        if i <= r_peaks[0] {
            out.push(rates[0]);
            continue;
        }
        while seg + 1 < r_peaks.len() && r_peaks[seg + 1] < i {
            seg += 1;
        }
        if seg + 1 >= r_peaks.len() {
            out.push(rates[rates.len() - 1]);
            continue;
        }
        let (x0, x1) = (r_peaks[seg] as f64, r_peaks[seg + 1] as f64);
        let t = (i as f64 - x0) / (x1 - x0);
        out.push(rates[seg] + t * (rates[seg + 1] - rates[seg]));
    }
    out
}

/// Mean, minimum and maximum heart rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl RateSummary {
    fn of(values: &[f64]) -> CbResult<Self> {
        if values.is_empty() {
            return Err(CbError::insufficient("no heart rate values"));
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { mean, min, max })
    }
}

/// Beats and the rate sequence derived from them
#[derive(Debug, Clone, Copy)]
pub struct BeatSeries<'a> {
    pub r_peaks: &'a [usize],
    pub sampling_rate: f64,
    pub heart_rate: &'a [f64],
}

/// Rate statistics from RR intervals; needs at least two intervals
pub struct IntervalRate;

impl<'a> Estimator<BeatSeries<'a>> for IntervalRate {
    type Output = RateSummary;

    fn name(&self) -> &'static str {
        "interval rate"
    }

    fn estimate(&self, beats: &BeatSeries<'a>) -> CbResult<RateSummary> {
        if beats.r_peaks.len() < 3 {
            return Err(CbError::insufficient(format!(
                "needs at least 2 RR intervals, found {}",
                beats.r_peaks.len().saturating_sub(1)
            )));
        }
        let rates: Vec<f64> = beats
            .r_peaks
            .windows(2)
            .map(|w| 60.0 * beats.sampling_rate / (w[1] - w[0]) as f64)
            .collect();
        RateSummary::of(&rates)
    }
}

/// Rate statistics of the interpolated per-sample rate
pub struct RateSeriesStats;

impl<'a> Estimator<BeatSeries<'a>> for RateSeriesStats {
    type Output = RateSummary;

    fn name(&self) -> &'static str {
        "rate series"
    }

    fn estimate(&self, beats: &BeatSeries<'a>) -> CbResult<RateSummary> {
        RateSummary::of(beats.heart_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::WithFallback;

    #[test]
    fn test_rate_interpolation() {
        let rate = instantaneous_rate(&[100, 1100, 1600], 1000.0, 2000);
        assert_eq!(rate.len(), 2000);
        // Periods 1.0 s and 0.5 s; first beat takes their mean 0.75 s
        assert!((rate[0] - 80.0).abs() < 1e-9);
        assert!((rate[100] - 80.0).abs() < 1e-9);
        assert!((rate[600] - 70.0).abs() < 1e-9);
        assert!((rate[1100] - 60.0).abs() < 1e-9);
        assert!((rate[1350] - 90.0).abs() < 1e-9);
        assert!((rate[1999] - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_rate_needs_two_peaks() {
        assert!(instantaneous_rate(&[], 1000.0, 100).is_empty());
        assert!(instantaneous_rate(&[50], 1000.0, 100).is_empty());
    }

    #[test]
    fn test_interval_rate() {
        let peaks = [0, 1000, 1500];
        let beats = BeatSeries { r_peaks: &peaks, sampling_rate: 1000.0, heart_rate: &[] };
        let summary = IntervalRate.estimate(&beats).unwrap();
        assert_eq!(summary.min, 60.0);
        assert_eq!(summary.max, 120.0);
        assert_eq!(summary.mean, 90.0);
    }

    #[test]
    fn test_fallback_to_rate_series() {
        let peaks = [0, 800];
        let rate = instantaneous_rate(&peaks, 1000.0, 1000);
        let beats = BeatSeries { r_peaks: &peaks, sampling_rate: 1000.0, heart_rate: &rate };

        assert!(IntervalRate.estimate(&beats).is_err());
        let summary = WithFallback::new(IntervalRate, RateSeriesStats).estimate(&beats).unwrap();
        assert!((summary.mean - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_beats_fails() {
        let beats = BeatSeries { r_peaks: &[], sampling_rate: 1000.0, heart_rate: &[] };
        assert!(WithFallback::new(IntervalRate, RateSeriesStats).estimate(&beats).is_err());
    }
}
