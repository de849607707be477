//! Descriptive statistics and correlation tests

use cardiobrain_core::{CbError, CbResult, Feature, Unavailable};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

pub fn mean(data: &[f64]) -> CbResult<f64> {
    if data.is_empty() {
        return Err(CbError::insufficient("mean of an empty sequence"));
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Central moment of order `k`
fn central_moment(data: &[f64], mean: f64, k: i32) -> f64 {
    data.iter().map(|x| (x - mean).powi(k)).sum::<f64>() / data.len() as f64
}

/// Standard deviation with `ddof` delta degrees of freedom
pub fn std_dev(data: &[f64], ddof: usize) -> CbResult<f64> {
    if data.len() <= ddof {
        return Err(CbError::insufficient(format!(
            "standard deviation with ddof={} needs more than {} samples",
            ddof,
            data.len()
        )));
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    Ok((ss / (data.len() - ddof) as f64).sqrt())
}

/// Bias-corrected sample skewness (G1)
pub fn skewness(data: &[f64]) -> CbResult<f64> {
    let n = data.len();
    if n < 3 {
        return Err(CbError::insufficient("skewness needs at least 3 samples"));
    }
    let m = mean(data)?;
    let m2 = central_moment(data, m, 2);
    if m2 <= f64::MIN_POSITIVE {
        return Err(CbError::degenerate("skewness of a constant sequence"));
    }
    let g1 = central_moment(data, m, 3) / m2.powf(1.5);
    let n = n as f64;
    Ok(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

/// Bias-corrected sample excess kurtosis (G2)
pub fn kurtosis(data: &[f64]) -> CbResult<f64> {
    let n = data.len();
    if n < 4 {
        return Err(CbError::insufficient("kurtosis needs at least 4 samples"));
    }
    let m = mean(data)?;
    let m2 = central_moment(data, m, 2);
    if m2 <= f64::MIN_POSITIVE {
        return Err(CbError::degenerate("kurtosis of a constant sequence"));
    }
    let g2 = central_moment(data, m, 4) / (m2 * m2) - 3.0;
    let n = n as f64;
    Ok(((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0)))
}

/// Percentile `q` in [0, 100] with linear interpolation between order statistics
pub fn percentile(data: &[f64], q: f64) -> CbResult<f64> {
    if data.is_empty() {
        return Err(CbError::insufficient("percentile of an empty sequence"));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(CbError::config(format!("percentile {} outside [0, 100]", q)));
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// First differences
pub fn diff(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Ranks starting at 1, ties sharing their average rank
pub fn rank(data: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| data[a].total_cmp(&data[b]));

    let mut ranks = vec![0.0; data.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && data[order[j + 1]] == data[order[i]] {
            j += 1;
        }
        let shared = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = shared;
        }
        i = j + 1;
    }
    ranks
}

/// Correlation coefficient with its two-sided p-value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTest {
    pub correlation: Feature,
    pub p_value: Feature,
}

impl CorrelationTest {
    fn undefined(reason: Unavailable) -> Self {
        Self {
            correlation: Feature::Unavailable(reason.clone()),
            p_value: Feature::Unavailable(reason),
        }
    }
}

/// Two-sided p-value of `r` under the null of zero correlation, Student t with n−2 df
fn correlation_p_value(r: f64, n: usize) -> CbResult<f64> {
    if n <= 2 {
        return Ok(1.0);
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return Ok(0.0);
    }
    let t = r * (df / denom).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| CbError::processing(e.to_string()))?;
    Ok((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

fn pearson_coefficient(x: &[f64], y: &[f64]) -> CbResult<f64> {
    if x.len() != y.len() {
        return Err(CbError::InvalidSignalData {
            reason: format!("correlation needs equal lengths, got {} and {}", x.len(), y.len()),
        });
    }
    if x.len() < 2 {
        return Err(CbError::insufficient("correlation needs at least 2 samples"));
    }

    let mx = mean(x)?;
    let my = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom <= f64::MIN_POSITIVE {
        return Err(CbError::degenerate("correlation with a constant input"));
    }
    Ok((sxy / denom).clamp(-1.0, 1.0))
}

fn correlation_test(x: &[f64], y: &[f64]) -> CorrelationTest {
    let r = match pearson_coefficient(x, y) {
        Ok(r) => r,
        Err(e) => return CorrelationTest::undefined(e.into()),
    };
    CorrelationTest {
        correlation: Feature::from_value(r),
        p_value: Feature::from_result(correlation_p_value(r, x.len())),
    }
}

/// Pearson linear correlation
pub fn pearson(x: &[f64], y: &[f64]) -> CorrelationTest {
    correlation_test(x, y)
}

/// Spearman rank correlation
pub fn spearman(x: &[f64], y: &[f64]) -> CorrelationTest {
    if x.len() != y.len() {
        return correlation_test(x, y);
    }
    correlation_test(&rank(x), &rank(y))
}

/// Full linear cross-correlation `c[lag] = Σ a[i + lag]·b[i]`
///
/// Entry `k` corresponds to lag `k − (len − 1)`.
pub fn cross_correlate(a: &[f64], b: &[f64]) -> CbResult<Vec<f64>> {
    if a.len() != b.len() {
        return Err(CbError::InvalidSignalData {
            reason: format!("cross-correlation needs equal lengths, got {} and {}", a.len(), b.len()),
        });
    }
    let n = a.len();
    if n == 0 {
        return Err(CbError::insufficient("cross-correlation of empty signals"));
    }

    let size = (2 * n - 1).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let pad = |data: &[f64]| {
        let mut buf: Vec<Complex<f64>> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buf.resize(size, Complex::new(0.0, 0.0));
        buf
    };
    let mut fa = pad(a);
    let mut fb = pad(b);
    forward.process(&mut fa);
    forward.process(&mut fb);

    let mut product: Vec<Complex<f64>> = fa.iter().zip(&fb).map(|(x, y)| x * y.conj()).collect();
    inverse.process(&mut product);

    let scale = 1.0 / size as f64;
    let lag = |k: usize| -> usize {
        // Negative lags wrap to the end of the circular result
        if k < n - 1 {
            size - (n - 1 - k)
        } else {
            k - (n - 1)
        }
    };
    Ok((0..2 * n - 1).map(|k| product[lag(k)].re * scale).collect())
}

/// Peak of the normalized cross-correlation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossCorrelationPeak {
    pub max_value: f64,
    pub lag_samples: i64,
}

/// Lag and signed value of the largest absolute cross-correlation, normalized by
/// `sqrt(Σa²·Σb²)`
pub fn cross_correlation_peak(a: &[f64], b: &[f64]) -> CbResult<CrossCorrelationPeak> {
    let corr = cross_correlate(a, b)?;

    let mut best = 0;
    for (k, value) in corr.iter().enumerate() {
        if value.abs() > corr[best].abs() {
            best = k;
        }
    }

    let energy = a.iter().map(|x| x * x).sum::<f64>() * b.iter().map(|x| x * x).sum::<f64>();
    let norm = energy.sqrt();
    let max_value = if norm > 0.0 {
        (corr[best] / norm).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    Ok(CrossCorrelationPeak {
        max_value,
        lag_samples: best as i64 - (a.len() as i64 - 1),
    })
}
