//! Batch analysis service: loading, pipeline execution and result files

use crate::format::{self, LoadOptions};
use anyhow::{bail, Context, Result};
use cardiobrain_core::{Modality, Signal};
use cardiobrain_processing::{AnalysisResult, CorrelationReport, Pipeline, ProcessingConfig};
use cardiobrain_simulation::{EcgSimConfig, EcgSimulator, EegSimConfig, EegSimulator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Results directory name, a sibling of the directory holding the request file
pub const RESULTS_DIR_NAME: &str = "results";

/// File name of the correlation written by a paired analysis
pub const CORRELATION_FILE: &str = "correlation.json";

/// Correlation of two stored analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelateRequest {
    pub ecg_analysis_id: String,
    pub eeg_analysis_id: String,
    pub output_path: PathBuf,
    #[serde(default)]
    pub results_dir: Option<PathBuf>,
    /// File the request was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl CorrelateRequest {
    /// Read a request file, remembering where it came from
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read request {}", path.display()))?;
        Self::parse(&json, path)
    }

    pub fn parse(json: &str, source: &Path) -> Result<Self> {
        let mut request: Self = serde_json::from_str(json)
            .with_context(|| format!("Invalid correlate request {}", source.display()))?;
        request.source = Some(source.to_path_buf());
        Ok(request)
    }

    /// `resultsDir` when given, else `results` next to the request file's directory
    pub fn results_dir(&self) -> PathBuf {
        if let Some(dir) = &self.results_dir {
            return dir.clone();
        }
        let root = self
            .source
            .as_deref()
            .and_then(Path::parent)
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""));
        root.join(RESULTS_DIR_NAME)
    }

    fn analysis_path(&self, id: &str) -> PathBuf {
        self.results_dir().join(format!("{}.json", id))
    }
}

/// Identifiers and correlation of a paired ECG/EEG analysis
#[derive(Debug, Clone)]
pub struct PairOutcome {
    pub ecg_id: String,
    pub eeg_id: String,
    pub report: CorrelationReport,
}

/// Runs the pipelines off the async runtime and persists their results
pub struct AnalysisService {
    pipeline: Arc<Pipeline>,
    config: ProcessingConfig,
}

impl AnalysisService {
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        let pipeline = Pipeline::new(&config).context("Invalid processing configuration")?;
        Ok(Self { pipeline: Arc::new(pipeline), config })
    }

    pub async fn load(&self, path: &Path, modality: Modality, sampling_rate: Option<f64>) -> Result<Signal> {
        let options = LoadOptions {
            modality,
            default_sampling_rate: self.config.ingest.default_sampling_rate,
            sampling_rate,
        };
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || format::load_signal(&owned, &options))
            .await?
            .with_context(|| format!("Failed to load {} recording {}", modality, path.display()))
    }

    pub async fn analyze(&self, signal: Signal) -> Result<AnalysisResult> {
        let pipeline = Arc::clone(&self.pipeline);
        let id = signal.id;
        let result = tokio::task::spawn_blocking(move || pipeline.analyze(&signal))
            .await?
            .with_context(|| format!("Analysis of signal {} failed", id))?;

        for (name, reason) in result.diagnostics().iter() {
            debug!("{}: {}", name, reason);
        }
        Ok(result)
    }

    /// Load, analyze and store a single recording
    pub async fn process_file(
        &self,
        file: &Path,
        modality: Modality,
        output: &Path,
        sampling_rate: Option<f64>,
    ) -> Result<AnalysisResult> {
        let signal = self.load(file, modality, sampling_rate).await?;
        let result = self.analyze(signal).await?;
        write_json(output, &result).await?;
        info!("{} analysis written to {}", modality, output.display());
        Ok(result)
    }

    /// Correlate two analyses stored as `<id>.json`
    pub async fn correlate_stored(&self, request: &CorrelateRequest) -> Result<CorrelationReport> {
        let ecg = read_analysis(&request.analysis_path(&request.ecg_analysis_id)).await?;
        let eeg = read_analysis(&request.analysis_path(&request.eeg_analysis_id)).await?;

        let Some(ecg) = ecg.as_ecg() else {
            bail!("Analysis {} is not an ECG analysis", request.ecg_analysis_id);
        };
        let Some(eeg) = eeg.as_eeg() else {
            bail!("Analysis {} is not an EEG analysis", request.eeg_analysis_id);
        };

        let report = self
            .pipeline
            .correlate(ecg, eeg)
            .context("Correlation failed")?
            .with_analysis_ids(request.ecg_analysis_id.as_str(), request.eeg_analysis_id.as_str());
        write_json(&request.output_path, &report).await?;
        info!("Correlation written to {}", request.output_path.display());
        Ok(report)
    }

    /// Analyze an ECG and an EEG recording in parallel, then correlate them
    pub async fn analyze_pair(&self, ecg_file: &Path, eeg_file: &Path, output_dir: &Path) -> Result<PairOutcome> {
        let (ecg_signal, eeg_signal) = tokio::try_join!(
            self.load(ecg_file, Modality::Ecg, None),
            self.load(eeg_file, Modality::Eeg, None)
        )?;
        let ecg_id = ecg_signal.id.to_string();
        let eeg_id = eeg_signal.id.to_string();

        let (ecg, eeg) = tokio::try_join!(self.analyze(ecg_signal), self.analyze(eeg_signal))?;
        write_json(&output_dir.join(format!("{}.json", ecg_id)), &ecg).await?;
        write_json(&output_dir.join(format!("{}.json", eeg_id)), &eeg).await?;

        let (Some(ecg), Some(eeg)) = (ecg.as_ecg(), eeg.as_eeg()) else {
            bail!("Pipeline returned results of the wrong modality");
        };
        let report = self
            .pipeline
            .correlate(ecg, eeg)
            .context("Correlation failed")?
            .with_analysis_ids(ecg_id.as_str(), eeg_id.as_str());
        write_json(&output_dir.join(CORRELATION_FILE), &report).await?;
        info!("Paired analysis written to {}", output_dir.display());

        Ok(PairOutcome { ecg_id, eeg_id, report })
    }
}

async fn read_analysis(path: &Path) -> Result<AnalysisResult> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read analysis {}", path.display()))?;
    AnalysisResult::from_json(&json).with_context(|| format!("Cannot parse analysis {}", path.display()))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Cannot write {}", path.display()))
}

/// Write a synthetic recording as a CSV table with a leading `Time` column
pub fn write_simulation(modality: Modality, duration: f64, sampling_rate: f64, output: &Path) -> Result<usize> {
    let (names, channels): (Vec<String>, Vec<Signal>) = match modality {
        Modality::Ecg => {
            let config = EcgSimConfig { sampling_rate, ..Default::default() };
            let signal = EcgSimulator::new(config)?.generate(duration)?;
            (vec!["ECG".to_string()], vec![signal])
        }
        Modality::Eeg => {
            let config = EegSimConfig { sampling_rate, ..Default::default() };
            let channels = EegSimulator::new(config)?.generate(duration)?;
            ((1..=channels.len()).map(|i| format!("Ch{}", i)).collect(), channels)
        }
    };

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Cannot create {}", output.display()))?;
    writer.write_record(std::iter::once("Time".to_string()).chain(names))?;

    let times = channels[0].time_vector();
    for (i, time) in times.iter().enumerate() {
        let row = std::iter::once(time.to_string()).chain(channels.iter().map(|c| c.samples()[i].to_string()));
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(times.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardiobrain_processing::PhaseLockingStatus;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cardiobrain-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_results_dir_resolution() {
        let json = r#"{"ecgAnalysisId": "a", "eegAnalysisId": "b", "outputPath": "out.json"}"#;
        let request = CorrelateRequest::parse(json, Path::new("/data/project/requests/req.json")).unwrap();
        assert_eq!(request.results_dir(), Path::new("/data/project/results"));
        assert_eq!(request.analysis_path("a"), Path::new("/data/project/results/a.json"));

        let request = CorrelateRequest::parse(json, Path::new("requests/req.json")).unwrap();
        assert_eq!(request.results_dir(), Path::new("results"));
        let request = CorrelateRequest::parse(json, Path::new("req.json")).unwrap();
        assert_eq!(request.results_dir(), Path::new("results"));

        let json = r#"{"ecgAnalysisId": "a", "eegAnalysisId": "b", "outputPath": "o", "resultsDir": "/r"}"#;
        let request = CorrelateRequest::parse(json, Path::new("/data/project/requests/req.json")).unwrap();
        assert_eq!(request.analysis_path("b"), Path::new("/r/b.json"));
    }

    #[test]
    fn test_write_simulation_tables() {
        let dir = scratch_dir();
        let ecg_path = dir.join("ecg.csv");
        assert_eq!(write_simulation(Modality::Ecg, 1.0, 1000.0, &ecg_path).unwrap(), 1000);

        let text = std::fs::read_to_string(&ecg_path).unwrap();
        assert!(text.starts_with("Time,ECG\n"));
        assert_eq!(text.lines().count(), 1001);
        let third_row = text.lines().nth(3).unwrap();
        assert!(third_row.starts_with("0.002,"), "row {}", third_row);

        let eeg_path = dir.join("eeg.csv");
        write_simulation(Modality::Eeg, 2.0, 250.0, &eeg_path).unwrap();
        let header = std::fs::read_to_string(&eeg_path).unwrap().lines().next().unwrap().to_string();
        assert_eq!(header, "Time,Ch1,Ch2,Ch3,Ch4");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_analyze_pair_then_correlate_stored() {
        let dir = scratch_dir();
        let ecg_path = dir.join("ecg.csv");
        let eeg_path = dir.join("eeg.csv");
        write_simulation(Modality::Ecg, 12.0, 1000.0, &ecg_path).unwrap();
        write_simulation(Modality::Eeg, 12.0, 1000.0, &eeg_path).unwrap();

        let service = AnalysisService::new(ProcessingConfig::default()).unwrap();
        let outcome = service.analyze_pair(&ecg_path, &eeg_path, &dir.join("out")).await.unwrap();

        assert!(dir.join("out").join(CORRELATION_FILE).exists());
        assert!(dir.join("out").join(format!("{}.json", outcome.ecg_id)).exists());
        assert_eq!(outcome.report.metadata.aligned_length, 12000);
        assert_ne!(
            outcome.report.frequency_domain.phase_locking_status,
            PhaseLockingStatus::SkippedInsufficientDuration
        );

        let request = CorrelateRequest {
            ecg_analysis_id: outcome.ecg_id.clone(),
            eeg_analysis_id: outcome.eeg_id.clone(),
            output_path: dir.join("again.json"),
            results_dir: Some(dir.join("out")),
            source: None,
        };
        let report = service.correlate_stored(&request).await.unwrap();
        assert_eq!(report.metadata.ecg_analysis_id.as_deref(), Some(outcome.ecg_id.as_str()));
        assert_eq!(report.metadata.aligned_length, 12000);

        let swapped = CorrelateRequest {
            ecg_analysis_id: outcome.eeg_id.clone(),
            eeg_analysis_id: outcome.ecg_id.clone(),
            ..request
        };
        assert!(service.correlate_stored(&swapped).await.is_err());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_correlate_request_finds_sibling_results() {
        let root = scratch_dir();
        let ecg_path = root.join("ecg.csv");
        let eeg_path = root.join("eeg.csv");
        write_simulation(Modality::Ecg, 12.0, 1000.0, &ecg_path).unwrap();
        write_simulation(Modality::Eeg, 12.0, 1000.0, &eeg_path).unwrap();

        let service = AnalysisService::new(ProcessingConfig::default()).unwrap();
        let ecg_out = root.join("results/ecg-1.json");
        let eeg_out = root.join("results/eeg-1.json");
        let ecg = service.process_file(&ecg_path, Modality::Ecg, &ecg_out, None);
        let eeg = service.process_file(&eeg_path, Modality::Eeg, &eeg_out, None);
        tokio::try_join!(ecg, eeg).unwrap();

        let request_path = root.join("requests").join("req.json");
        std::fs::create_dir_all(root.join("requests")).unwrap();
        let output = root.join("correlation.json");
        let json = serde_json::json!({
            "ecgAnalysisId": "ecg-1",
            "eegAnalysisId": "eeg-1",
            "outputPath": output,
        });
        std::fs::write(&request_path, json.to_string()).unwrap();

        let request = CorrelateRequest::load(&request_path).await.unwrap();
        assert_eq!(request.results_dir(), root.join("results"));
        let report = service.correlate_stored(&request).await.unwrap();
        assert_eq!(report.metadata.eeg_analysis_id.as_deref(), Some("eeg-1"));
        assert!(output.exists());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_process_rejects_unknown_format() {
        let service = AnalysisService::new(ProcessingConfig::default()).unwrap();
        let result = service
            .process_file(Path::new("recording.mat"), Modality::Ecg, Path::new("out.json"), None)
            .await;
        assert!(result.is_err());
    }
}
