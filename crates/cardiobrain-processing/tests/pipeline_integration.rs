//! End-to-end tests of the ECG and EEG pipelines on synthetic recordings

use cardiobrain_core::{Modality, Signal};
use cardiobrain_processing::{
    analyze, AnalysisResult, EcgPipeline, EegPipeline, ProcessingConfig, ECG_FEATURES, EEG_FEATURES,
};
use cardiobrain_simulation::{BeatTemplate, EcgSimConfig, EcgSimulator, EegSimConfig, EegSimulator};

fn simulated_ecg(template: BeatTemplate, seconds: f64, seed: u64) -> Signal {
    let config = EcgSimConfig { template, seed: Some(seed), ..Default::default() };
    EcgSimulator::new(config).unwrap().generate(seconds).unwrap()
}

#[test]
fn test_spike_train_peak_count() {
    let signal = simulated_ecg(BeatTemplate::Spike, 10.0, 11);
    let config = ProcessingConfig::default();
    let analysis = EcgPipeline::new(&config.ecg).analyze(&signal).unwrap();

    let count = analysis.peaks.r_peaks.len();
    assert!((37..=41).contains(&count), "found {} R-peaks", count);
    assert!(analysis.peaks.r_peaks.windows(2).all(|w| w[0] < w[1]));

    // Tiling a 256-sample beat at 1000 Hz beats at 234.375 BPM
    let mean_hr = analysis.features.value("mean_hr").unwrap();
    let expected = BeatTemplate::Spike.heart_rate(1000.0);
    assert!((mean_hr - expected).abs() < 2.0, "mean HR {}", mean_hr);
}

#[test]
fn test_physiological_template_rate() {
    let template = BeatTemplate::Padded { length: 800 };
    let config = EcgSimConfig { template, seed: Some(5), ..Default::default() };
    let mut simulator = EcgSimulator::new(config).unwrap();
    let signal = simulator.generate(30.0).unwrap();
    let analysis = EcgPipeline::new(&ProcessingConfig::default().ecg).analyze(&signal).unwrap();

    let mean_hr = analysis.features.value("mean_hr").unwrap();
    assert!((40.0..=180.0).contains(&mean_hr));
    assert!((mean_hr - template.heart_rate(1000.0)).abs() < 1.0);

    // Every detected R-peak sits on a simulated beat maximum
    let beats = simulator.beat_positions(signal.len());
    for &peak in &analysis.peaks.r_peaks {
        let nearest = beats.iter().map(|&b| b.abs_diff(peak)).min().unwrap();
        assert!(nearest <= 10, "R-peak {} is {} samples from a beat", peak, nearest);
    }
    assert!(analysis.features.value("rmssd").is_some());
    assert_eq!(analysis.peaks.q_peaks.len(), analysis.peaks.r_peaks.len());
}

#[test]
fn test_zero_ecg_serializes_null_features() {
    let signal = Signal::new(vec![0.0; 10_000], 1000.0, Modality::Ecg).unwrap();
    let result = analyze(&signal, &ProcessingConfig::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    for name in ECG_FEATURES {
        assert!(json["features"][name].is_null(), "{} should be null", name);
    }
    assert_eq!(json["peaks"]["r_peaks"].as_array().map(Vec::len), Some(0));
    assert!(!result.diagnostics().is_empty());
}

#[test]
fn test_zero_eeg_reports_zeros() {
    let signal = Signal::new(vec![0.0; 2500], 250.0, Modality::Eeg).unwrap();
    let result = analyze(&signal, &ProcessingConfig::default()).unwrap();
    let eeg = result.as_eeg().unwrap();

    for name in EEG_FEATURES {
        assert_eq!(eeg.features.value(name), Some(0.0), "{}", name);
    }
    assert!(eeg.bands.iter().all(|(_, power)| power == 0.0));
}

#[test]
fn test_simulated_eeg_channels() {
    let config = EegSimConfig { seed: Some(9), ..Default::default() };
    let channels = EegSimulator::new(config).unwrap().generate(10.0).unwrap();
    let pipeline = EegPipeline::new(&ProcessingConfig::default().eeg);

    // Channel rhythms are 10, 12, 8 and 15 Hz
    let alpha = pipeline.analyze(&channels[0]).unwrap();
    let beta = pipeline.analyze(&channels[3]).unwrap();

    assert!(alpha.bands.alpha > alpha.bands.beta);
    assert!(beta.bands.beta > beta.bands.alpha);
    assert!(alpha.bands.total() <= 1.0 + 1e-9);
    assert_eq!(alpha.band_power_estimate.len(), 5);
    assert!(alpha.features.value("std").unwrap() > 0.5);
}

#[test]
fn test_analysis_round_trip() {
    let signal = simulated_ecg(BeatTemplate::Padded { length: 800 }, 10.0, 2);
    let result = analyze(&signal, &ProcessingConfig::default()).unwrap();

    let parsed = AnalysisResult::from_json(&result.to_json().unwrap()).unwrap();
    let (before, after) = (result.as_ecg().unwrap(), parsed.as_ecg().unwrap());
    assert_eq!(before.peaks, after.peaks);
    let hr_before = before.features.value("mean_hr").unwrap();
    let hr_after = after.features.value("mean_hr").unwrap();
    assert!((hr_before - hr_after).abs() < 1e-9);
    assert_eq!(before.diagnostics, after.diagnostics);
}
