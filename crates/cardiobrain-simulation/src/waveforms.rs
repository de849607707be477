//! Waveform building blocks for synthetic recordings

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Leading silence before the QRS spike of a beat
const SPIKE_OFFSET: usize = 100;

/// QRS-like spike shared by every beat template
const SPIKE: [f64; 6] = [0.1, 0.5, 1.0, 0.3, 0.1, 0.0];

/// One heartbeat, tiled end to end to build an ECG trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BeatTemplate {
    /// 100 zeros, the spike, 150 zeros: 256 samples per beat
    Spike,
    /// The spike after 100 zeros, zero-padded to `length` samples
    Padded { length: usize },
}

impl Default for BeatTemplate {
    fn default() -> Self {
        BeatTemplate::Spike
    }
}

impl BeatTemplate {
    /// Samples of a single beat
    pub fn samples(&self) -> Vec<f64> {
        let mut beat = vec![0.0; self.period()];
        beat[SPIKE_OFFSET..SPIKE_OFFSET + SPIKE.len()].copy_from_slice(&SPIKE);
        beat
    }

    /// Beat length in samples
    pub fn period(&self) -> usize {
        let minimum = SPIKE_OFFSET + SPIKE.len();
        match self {
            BeatTemplate::Spike => minimum + 150,
            BeatTemplate::Padded { length } => (*length).max(minimum),
        }
    }

    /// Offset of the spike maximum within the beat
    pub fn peak_offset(&self) -> usize {
        SPIKE_OFFSET + 2
    }

    /// Heart rate produced by tiling this beat at `sampling_rate`
    pub fn heart_rate(&self, sampling_rate: f64) -> f64 {
        60.0 * sampling_rate / self.period() as f64
    }
}

/// Sinusoidal oscillation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rhythm {
    /// Frequency in Hz
    pub frequency: f64,
    pub amplitude: f64,
}

impl Rhythm {
    pub fn new(frequency: f64, amplitude: f64) -> Self {
        Self { frequency, amplitude }
    }

    pub fn value_at(&self, time: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency * time).sin()
    }
}
