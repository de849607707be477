//! Amplitude artifact rejection

use tracing::debug;

/// Signal with outliers replaced, and how many samples were replaced
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRejection {
    pub cleaned: Vec<f64>,
    pub replaced: usize,
}

/// Replace samples with |z| above `z_threshold` by linear interpolation between
/// the nearest retained samples, holding the edge values constant
///
/// A constant signal, or one where every sample is an outlier, is returned
/// unchanged.
pub fn reject_artifacts(data: &[f64], z_threshold: f64) -> ArtifactRejection {
    let unchanged = || ArtifactRejection { cleaned: data.to_vec(), replaced: 0 };
    if data.is_empty() {
        return unchanged();
    }

    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let std = (data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
    if !(std > 0.0) {
        return unchanged();
    }

    let marked: Vec<bool> = data.iter().map(|x| ((x - mean) / std).abs() > z_threshold).collect();
    let replaced = marked.iter().filter(|&&m| m).count();
    if replaced == 0 {
        return unchanged();
    }
    if replaced == data.len() {
        debug!("Every sample exceeds |z| > {}, artifacts left in place", z_threshold);
        return unchanged();
    }

    let mut cleaned = data.to_vec();
    let mut previous: Option<usize> = None;
    let mut i = 0;
    while i < data.len() {
        if !marked[i] {
            previous = Some(i);
            i += 1;
            continue;
        }

        let run_end = (i..data.len()).find(|&j| !marked[j]);
        for k in i..run_end.unwrap_or(data.len()) {
            cleaned[k] = match (previous, run_end) {
                (Some(a), Some(b)) => {
                    let t = (k - a) as f64 / (b - a) as f64;
                    data[a] + t * (data[b] - data[a])
                }
                (Some(a), None) => data[a],
                (None, Some(b)) => data[b],
                (None, None) => data[k],
            };
        }
        i = run_end.unwrap_or(data.len());
    }

    debug!("Replaced {} artifact samples", replaced);
    ArtifactRejection { cleaned, replaced }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolates_spike() {
        let mut data: Vec<f64> = (0..100).map(|i| (i % 2) as f64).collect();
        data[50] = 100.0;
        let result = reject_artifacts(&data, 3.0);

        assert_eq!(result.replaced, 1);
        assert!((result.cleaned[50] - 1.0).abs() < 1e-12);
        assert_eq!(result.cleaned[49], data[49]);
    }

    #[test]
    fn test_interpolates_between_neighbours() {
        let mut data = vec![0.0; 40];
        for (i, x) in data.iter_mut().enumerate() {
            *x = i as f64 * 0.1;
        }
        data[20] = 500.0;
        data[21] = 500.0;
        let result = reject_artifacts(&data, 3.0);

        assert_eq!(result.replaced, 2);
        assert!((result.cleaned[20] - 2.0).abs() < 1e-12);
        assert!((result.cleaned[21] - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_edge_artifacts_hold_nearest_value() {
        let mut data = vec![1.0, -1.0].repeat(30);
        data[0] = 80.0;
        let last = data.len() - 1;
        data[last] = -80.0;
        let result = reject_artifacts(&data, 3.0);

        assert_eq!(result.replaced, 2);
        assert_eq!(result.cleaned[0], data[1]);
        assert_eq!(result.cleaned[last], data[last - 1]);
    }

    #[test]
    fn test_constant_signal_untouched() {
        let result = reject_artifacts(&[0.0; 50], 3.0);
        assert_eq!(result.replaced, 0);
        assert!(result.cleaned.iter().all(|&x| x == 0.0));
        assert!(result.cleaned.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_empty_signal() {
        assert!(reject_artifacts(&[], 3.0).cleaned.is_empty());
    }
}
