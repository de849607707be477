//! Throughput of the feature pipelines and the correlation engine
//!
//! Recordings are 10 s of simulated ECG at 1000 Hz and EEG at 250 Hz, the
//! sizes the CLI handles by default.

use cardiobrain_processing::{
    filters::FilterConfig, resample::resample, spectral::welch, CorrelationEngine, EcgPipeline,
    EegPipeline, ProcessingConfig,
};
use cardiobrain_simulation::{BeatTemplate, EcgSimConfig, EcgSimulator, EegSimConfig, EegSimulator};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn ecg_signal(seconds: f64) -> cardiobrain_core::Signal {
    let config = EcgSimConfig {
        template: BeatTemplate::Padded { length: 800 },
        seed: Some(1),
        ..Default::default()
    };
    EcgSimulator::new(config).unwrap().generate(seconds).unwrap()
}

fn eeg_signal(seconds: f64) -> cardiobrain_core::Signal {
    let config = EegSimConfig { channel_count: 1, seed: Some(2), ..Default::default() };
    EegSimulator::new(config).unwrap().generate_channel(0, seconds).unwrap()
}

fn bench_building_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("building_blocks");
    let eeg = eeg_signal(10.0);

    let bandpass = FilterConfig::bandpass(0.5, 45.0, 2).build(250.0).unwrap();
    group.bench_function("bandpass_filtfilt", |b| {
        b.iter(|| black_box(bandpass.process(black_box(eeg.samples()))))
    });

    group.bench_function("welch_psd", |b| {
        b.iter(|| black_box(welch(black_box(eeg.samples()), 250.0, 250).unwrap()))
    });

    for &factor in &[2usize, 4] {
        let target = eeg.len() * factor;
        group.bench_with_input(BenchmarkId::new("resample", format!("x{}", factor)), &target, |b, &target| {
            b.iter(|| black_box(resample(black_box(eeg.samples()), target).unwrap()))
        });
    }

    group.finish();
}

fn bench_pipelines(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipelines");
    let config = ProcessingConfig::default();
    let ecg_pipeline = EcgPipeline::new(&config.ecg);
    let eeg_pipeline = EegPipeline::new(&config.eeg);

    for &seconds in &[10.0, 60.0] {
        let ecg = ecg_signal(seconds);
        let eeg = eeg_signal(seconds);

        group.bench_with_input(BenchmarkId::new("ecg", format!("{}s", seconds)), &ecg, |b, signal| {
            b.iter(|| black_box(ecg_pipeline.analyze(signal).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("eeg", format!("{}s", seconds)), &eeg, |b, signal| {
            b.iter(|| black_box(eeg_pipeline.analyze(signal).unwrap()))
        });
    }

    group.finish();
}

fn bench_correlation(c: &mut Criterion) {
    let config = ProcessingConfig::default();
    let ecg = EcgPipeline::new(&config.ecg).analyze(&ecg_signal(12.0)).unwrap();
    let eeg = EegPipeline::new(&config.eeg).analyze(&eeg_signal(12.0)).unwrap();
    let engine = CorrelationEngine::new(&config.correlation);

    c.bench_function("correlate_12s", |b| {
        b.iter(|| black_box(engine.correlate(black_box(&ecg), black_box(&eeg)).unwrap()))
    });
}

criterion_group!(benches, bench_building_blocks, bench_pipelines, bench_correlation);
criterion_main!(benches);
