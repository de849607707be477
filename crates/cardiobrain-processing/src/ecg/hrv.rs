//! Heart rate variability
//!
//! Three independent families computed from RR intervals: time domain
//! (SDNN, RMSSD), frequency domain (LF/HF ratio of the resampled tachogram)
//! and nonlinear (sample entropy).

use crate::config::EcgConfig;
use crate::spectral;
use crate::stats;
use cardiobrain_core::{CbError, CbResult};

/// RR intervals in milliseconds
pub fn rr_intervals_ms(r_peaks: &[usize], sampling_rate: f64) -> Vec<f64> {
    r_peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 * 1000.0 / sampling_rate)
        .collect()
}

/// Time-domain HRV in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDomain {
    pub sdnn: f64,
    pub rmssd: f64,
}

pub fn time_domain(rr_ms: &[f64]) -> CbResult<TimeDomain> {
    if rr_ms.len() < 2 {
        return Err(CbError::insufficient(format!(
            "time-domain HRV needs at least 2 RR intervals, found {}",
            rr_ms.len()
        )));
    }
    let sdnn = stats::std_dev(rr_ms, 1)?;
    let successive = stats::diff(rr_ms);
    let rmssd = (successive.iter().map(|d| d * d).sum::<f64>() / successive.len() as f64).sqrt();
    Ok(TimeDomain { sdnn, rmssd })
}

/// LF/HF power ratio of the RR tachogram
///
/// The tachogram is linearly interpolated at `tachogram_rate` between beat
/// times and mean-detrended before Welch estimation. It must be long enough
/// for the spectral resolution to reach the lower LF edge.
pub fn lf_hf_ratio(r_peaks: &[usize], sampling_rate: f64, config: &EcgConfig) -> CbResult<f64> {
    if r_peaks.len() < 3 {
        return Err(CbError::insufficient("frequency-domain HRV needs at least 2 RR intervals"));
    }

    let times: Vec<f64> = r_peaks[1..].iter().map(|&p| p as f64 / sampling_rate).collect();
    let rr: Vec<f64> = rr_intervals_ms(r_peaks, sampling_rate);
    let fs = config.tachogram_rate;

    let tachogram = interpolate_uniform(&times, &rr, fs);
    let nperseg = tachogram.len().min(256);
    let resolution = fs / nperseg.max(1) as f64;
    let lowest = if config.lf_band.0 > 0.0 { config.lf_band.0 } else { config.lf_band.1 };
    if resolution > lowest {
        return Err(CbError::insufficient(format!(
            "tachogram of {:.1}s cannot resolve {}Hz",
            tachogram.len() as f64 / fs,
            lowest
        )));
    }

    let mean = stats::mean(&tachogram)?;
    let detrended: Vec<f64> = tachogram.iter().map(|x| x - mean).collect();
    let spectrum = spectral::welch(&detrended, fs, nperseg)?;

    let lf = spectrum.band_sum(config.lf_band.0, config.lf_band.1, false) * resolution;
    let hf = spectrum.band_sum(config.hf_band.0, config.hf_band.1, false) * resolution;
    if !(hf > 0.0) {
        return Err(CbError::degenerate("no high-frequency HRV power"));
    }
    Ok(lf / hf)
}

/// Sample `values` (at increasing `times`) on a uniform grid from the first to the last time
fn interpolate_uniform(times: &[f64], values: &[f64], fs: f64) -> Vec<f64> {
    let (Some(&start), Some(&end)) = (times.first(), times.last()) else {
        return Vec::new();
    };
    let count = ((end - start) * fs).floor() as usize + 1;

    let mut out = Vec::with_capacity(count);
    let mut seg = 0;
    for i in 0..count {
        let t = start + i as f64 / fs;
        while seg + 2 < times.len() && times[seg + 1] < t {
            seg += 1;
        }
        if seg + 1 >= times.len() {
            out.push(values[seg]);
            continue;
        }
        let (t0, t1) = (times[seg], times[seg + 1]);
        let frac = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
        out.push(values[seg] + frac * (values[seg + 1] - values[seg]));
    }
    out
}

/// Sample entropy with embedding dimension `m` and tolerance `r_ratio` times the
/// sample standard deviation
///
/// Undefined when no template pairs match at either length.
pub fn sample_entropy(series: &[f64], m: usize, r_ratio: f64) -> CbResult<f64> {
    let n = series.len();
    if n < m + 2 {
        return Err(CbError::insufficient(format!(
            "sample entropy with m={} needs at least {} values, found {}",
            m,
            m + 2,
            n
        )));
    }
    let r = r_ratio * stats::std_dev(series, 1)?;

    let templates = n - m;
    let within = |i: usize, j: usize, len: usize| {
        (0..len).all(|k| (series[i + k] - series[j + k]).abs() <= r)
    };

    let (mut b, mut a) = (0u64, 0u64);
    for i in 0..templates {
        for j in i + 1..templates {
            if within(i, j, m) {
                b += 1;
                if (series[i + m] - series[j + m]).abs() <= r {
                    a += 1;
                }
            }
        }
    }

    if a == 0 || b == 0 {
        return Err(CbError::degenerate(format!(
            "no template matches (A={}, B={})",
            a, b
        )));
    }
    Ok(-(a as f64 / b as f64).ln())
}
