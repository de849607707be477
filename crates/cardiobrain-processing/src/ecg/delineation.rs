//! P, Q, S and T wave location around detected R-peaks
//!
//! Each landmark is the extremum of the cleaned signal in a window anchored
//! on its R-peak and clamped to the neighbouring beats. Landmark types are
//! located independently so one failing type leaves the others intact.

use cardiobrain_core::{CbError, CbResult};
use serde::{Deserialize, Serialize};

/// Landmark sample indices into the cleaned ECG, each list strictly increasing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakSet {
    pub r_peaks: Vec<usize>,
    pub p_peaks: Vec<usize>,
    pub q_peaks: Vec<usize>,
    pub s_peaks: Vec<usize>,
    pub t_peaks: Vec<usize>,
}

/// ECG wave landmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landmark {
    P,
    Q,
    S,
    T,
}

impl Landmark {
    pub const ALL: [Landmark; 4] = [Landmark::P, Landmark::Q, Landmark::S, Landmark::T];

    /// Key used in serialized peak sets and diagnostics
    pub fn key(&self) -> &'static str {
        match self {
            Landmark::P => "p_peaks",
            Landmark::Q => "q_peaks",
            Landmark::S => "s_peaks",
            Landmark::T => "t_peaks",
        }
    }
}

// Window bounds in seconds relative to the anchor
const QS_SEARCH: f64 = 0.06;
const P_SEARCH: f64 = 0.25;
const P_GAP: f64 = 0.02;
const T_OFFSET: f64 = 0.06;
const T_SEARCH: f64 = 0.4;

/// Window-based wave delineator
pub struct Delineator<'a> {
    cleaned: &'a [f64],
    r_peaks: &'a [usize],
    sampling_rate: f64,
}

impl<'a> Delineator<'a> {
    pub fn new(cleaned: &'a [f64], r_peaks: &'a [usize], sampling_rate: f64) -> Self {
        Self { cleaned, r_peaks, sampling_rate }
    }

    fn samples(&self, seconds: f64) -> usize {
        (seconds * self.sampling_rate).round() as usize
    }

    fn check_peaks(&self) -> CbResult<()> {
        if let Some(&bad) = self.r_peaks.iter().find(|&&r| r >= self.cleaned.len()) {
            return Err(CbError::InvalidSignalData {
                reason: format!("R-peak {} outside signal of {} samples", bad, self.cleaned.len()),
            });
        }
        if self.r_peaks.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CbError::InvalidSignalData {
                reason: "R-peaks are not strictly increasing".to_string(),
            });
        }
        Ok(())
    }

    /// Lower bound for windows before beat `k`: just after the previous R-peak
    fn previous_bound(&self, k: usize) -> usize {
        if k == 0 { 0 } else { self.r_peaks[k - 1] + 1 }
    }

    /// Upper bound (exclusive) for windows after beat `k`: the next R-peak
    fn next_bound(&self, k: usize) -> usize {
        self.r_peaks.get(k + 1).copied().unwrap_or(self.cleaned.len())
    }

    fn q_wave(&self, k: usize) -> Option<usize> {
        let r = self.r_peaks[k];
        let start = r.saturating_sub(self.samples(QS_SEARCH)).max(self.previous_bound(k));
        arg_extremum(self.cleaned, start, r, false)
    }

    fn s_wave(&self, k: usize) -> Option<usize> {
        let r = self.r_peaks[k];
        let end = (r + self.samples(QS_SEARCH) + 1).min(self.next_bound(k));
        arg_extremum(self.cleaned, r + 1, end, false)
    }

    fn p_wave(&self, k: usize) -> Option<usize> {
        let r = self.r_peaks[k];
        let anchor = self.q_wave(k).unwrap_or_else(|| r.saturating_sub(self.samples(QS_SEARCH)));
        let start = r.saturating_sub(self.samples(P_SEARCH)).max(self.previous_bound(k));
        let end = anchor.checked_sub(self.samples(P_GAP))? + 1;
        arg_extremum(self.cleaned, start, end.min(anchor), true)
    }

    fn t_wave(&self, k: usize) -> Option<usize> {
        let r = self.r_peaks[k];
        let anchor = self.s_wave(k).unwrap_or(r + self.samples(QS_SEARCH));
        let start = anchor + self.samples(T_OFFSET);
        let end = (r + self.samples(T_SEARCH)).min(self.next_bound(k));
        arg_extremum(self.cleaned, start, end, true)
    }

    /// Locate one landmark type for every beat that has a usable window
    pub fn locate(&self, landmark: Landmark) -> CbResult<Vec<usize>> {
        self.check_peaks()?;

        let mut found: Vec<usize> = (0..self.r_peaks.len())
            .filter_map(|k| match landmark {
                Landmark::P => self.p_wave(k),
                Landmark::Q => self.q_wave(k),
                Landmark::S => self.s_wave(k),
                Landmark::T => self.t_wave(k),
            })
            .collect();
        found.dedup();
        Ok(found)
    }
}

/// Index of the minimum (or maximum) of `data[start..end]`, `None` for an empty window
fn arg_extremum(data: &[f64], start: usize, end: usize, maximum: bool) -> Option<usize> {
    let end = end.min(data.len());
    if start >= end {
        return None;
    }
    let mut best = start;
    for i in start + 1..end {
        let better = if maximum { data[i] > data[best] } else { data[i] < data[best] };
        if better {
            best = i;
        }
    }
    Some(best)
}
