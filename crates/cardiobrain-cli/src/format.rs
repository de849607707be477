//! Recording formats: delimited text tables and EDF
//!
//! Each handler turns a file into a single-channel [`Signal`] of the requested
//! modality. Text tables carry no rate metadata and fall back to the
//! configured default; EDF takes the rate from its header. An explicit rate
//! always wins.

use cardiobrain_core::{CbError, CbResult, Modality, Signal};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Comma separated table with a header row (`.csv`, `.txt`)
    DelimitedText,
    /// European Data Format (`.edf`)
    Edf,
}

impl DataFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> CbResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" | "txt" => Ok(DataFormat::DelimitedText),
            "edf" => Ok(DataFormat::Edf),
            other => Err(CbError::format(format!(
                "unsupported file format '.{}' for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// What to load and how to date it
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub modality: Modality,
    /// Rate for formats without rate metadata
    pub default_sampling_rate: f64,
    /// Rate that overrides any file metadata
    pub sampling_rate: Option<f64>,
}

/// Format handler trait
pub trait FormatHandler {
    fn format_id(&self) -> DataFormat;

    fn load(&self, path: &Path, options: &LoadOptions) -> CbResult<Signal> {
        let bytes = std::fs::read(path)
            .map_err(|e| CbError::format(format!("cannot read {}: {}", path.display(), e)))?;
        self.parse(&bytes, options)
    }

    fn parse(&self, bytes: &[u8], options: &LoadOptions) -> CbResult<Signal>;
}

/// Load a recording, choosing the handler from the file extension
pub fn load_signal(path: &Path, options: &LoadOptions) -> CbResult<Signal> {
    let handler: &dyn FormatHandler = match DataFormat::from_path(path)? {
        DataFormat::DelimitedText => &TextTableHandler,
        DataFormat::Edf => &EdfHandler,
    };
    let signal = handler.load(path, options)?;
    debug!(
        "Loaded {} samples of {} at {}Hz from {} ({:?})",
        signal.len(),
        signal.modality(),
        signal.sampling_rate(),
        path.display(),
        handler.format_id()
    );
    Ok(signal)
}

/// CSV/TXT table handler
pub struct TextTableHandler;

impl TextTableHandler {
    fn read_table<R: Read>(reader: R) -> CbResult<(Vec<String>, Vec<csv::StringRecord>)> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|e| CbError::format(format!("cannot read table header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CbError::format(format!("malformed table row: {}", e)))?;
        Ok((headers, rows))
    }

    fn is_numeric(rows: &[csv::StringRecord], column: usize) -> bool {
        !rows.is_empty()
            && rows
                .iter()
                .all(|row| row.get(column).map_or(false, |v| v.parse::<f64>().is_ok()))
    }

    /// Column named after the modality, else the first numeric column other than time
    fn select_column(headers: &[String], rows: &[csv::StringRecord], modality: Modality) -> CbResult<usize> {
        if let Some(named) = headers
            .iter()
            .position(|h| h.to_ascii_lowercase().contains(modality.tag()))
        {
            return Ok(named);
        }

        let numeric: Vec<usize> = (0..headers.len()).filter(|&c| Self::is_numeric(rows, c)).collect();
        numeric
            .iter()
            .copied()
            .find(|&c| !headers[c].eq_ignore_ascii_case("time"))
            .or_else(|| numeric.first().copied())
            .ok_or_else(|| CbError::format("no numeric columns found in the table"))
    }
}

impl FormatHandler for TextTableHandler {
    fn format_id(&self) -> DataFormat {
        DataFormat::DelimitedText
    }

    fn parse(&self, bytes: &[u8], options: &LoadOptions) -> CbResult<Signal> {
        let (headers, rows) = Self::read_table(bytes)?;
        let column = Self::select_column(&headers, &rows, options.modality)?;

        let samples = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.get(column)
                    .and_then(|v| v.parse::<f64>().ok())
                    .ok_or_else(|| {
                        CbError::format(format!("row {} of column '{}' is not a number", i + 1, headers[column]))
                    })
            })
            .collect::<CbResult<Vec<f64>>>()?;

        let rate = options.sampling_rate.unwrap_or(options.default_sampling_rate);
        Signal::new(samples, rate, options.modality)
    }
}

/// One EDF signal after physical scaling
#[derive(Debug, Clone)]
pub struct EdfChannel {
    pub label: String,
    pub sampling_rate: f64,
    pub samples: Vec<f64>,
}

const EDF_HEADER_LEN: usize = 256;
const EDF_SIGNAL_HEADER_LEN: usize = 256;
const EDF_ANNOTATIONS: &str = "EDF Annotations";

/// EDF handler
pub struct EdfHandler;

impl EdfHandler {
    fn field(bytes: &[u8], offset: usize, len: usize) -> CbResult<String> {
        let raw = bytes
            .get(offset..offset + len)
            .ok_or_else(|| CbError::format("EDF header is truncated"))?;
        Ok(String::from_utf8_lossy(raw).trim().to_string())
    }

    fn number<T: std::str::FromStr>(bytes: &[u8], offset: usize, len: usize, name: &str) -> CbResult<T> {
        let text = Self::field(bytes, offset, len)?;
        text.parse()
            .map_err(|_| CbError::format(format!("EDF {} '{}' is not a number", name, text)))
    }

    /// Decode every signal of an EDF file
    pub fn channels(bytes: &[u8]) -> CbResult<Vec<EdfChannel>> {
        let header_len: usize = Self::number(bytes, 184, 8, "header size")?;
        let declared_records: i64 = Self::number(bytes, 236, 8, "record count")?;
        let record_duration: f64 = Self::number(bytes, 244, 8, "record duration")?;
        let ns: usize = Self::number(bytes, 252, 4, "signal count")?;
        if ns == 0 || header_len != EDF_HEADER_LEN + ns * EDF_SIGNAL_HEADER_LEN {
            return Err(CbError::format(format!(
                "EDF header size {} does not match {} signals",
                header_len, ns
            )));
        }
        if !(record_duration > 0.0) {
            return Err(CbError::format("EDF record duration must be positive"));
        }

        // Signal headers are stored field by field across all signals
        let column = |field_offset: usize, width: usize, i: usize| EDF_HEADER_LEN + field_offset * ns + i * width;
        let mut labels = Vec::with_capacity(ns);
        let mut gains = Vec::with_capacity(ns);
        let mut counts = Vec::with_capacity(ns);
        for i in 0..ns {
            labels.push(Self::field(bytes, column(0, 16, i), 16)?);
            let physical_min: f64 = Self::number(bytes, column(104, 8, i), 8, "physical minimum")?;
            let physical_max: f64 = Self::number(bytes, column(112, 8, i), 8, "physical maximum")?;
            let digital_min: f64 = Self::number(bytes, column(120, 8, i), 8, "digital minimum")?;
            let digital_max: f64 = Self::number(bytes, column(128, 8, i), 8, "digital maximum")?;
            if digital_max == digital_min {
                return Err(CbError::format(format!("EDF signal '{}' has an empty digital range", labels[i])));
            }
            let gain = (physical_max - physical_min) / (digital_max - digital_min);
            gains.push((gain, digital_min, physical_min));
            counts.push(Self::number::<usize>(bytes, column(216, 8, i), 8, "samples per record")?);
        }

        let record_len: usize = counts.iter().sum::<usize>() * 2;
        let data = bytes.get(header_len..).unwrap_or_default();
        if record_len == 0 {
            return Err(CbError::format("EDF records carry no samples"));
        }
        let available = data.len() / record_len;
        let records = if declared_records < 0 {
            available
        } else {
            (declared_records as usize).min(available)
        };

        let mut channels: Vec<EdfChannel> = labels
            .into_iter()
            .zip(&counts)
            .map(|(label, &count)| EdfChannel {
                label,
                sampling_rate: count as f64 / record_duration,
                samples: Vec::with_capacity(count * records),
            })
            .collect();

        let mut cursor = 0;
        for _ in 0..records {
            for (i, channel) in channels.iter_mut().enumerate() {
                let (gain, digital_min, physical_min) = gains[i];
                for chunk in data[cursor..cursor + counts[i] * 2].chunks_exact(2) {
                    let digital = i16::from_le_bytes([chunk[0], chunk[1]]) as f64;
                    channel.samples.push(physical_min + (digital - digital_min) * gain);
                }
                cursor += counts[i] * 2;
            }
        }
        Ok(channels)
    }

    /// Channel labelled with the modality, else for EEG the first non-cardiac signal
    fn select_channel(channels: &[EdfChannel], modality: Modality) -> CbResult<usize> {
        let label = |i: usize| channels[i].label.to_ascii_lowercase();
        let is_cardiac = |l: &str| l.contains("ecg") || l.contains("ekg");
        let usable = |i: usize| channels[i].label != EDF_ANNOTATIONS && !channels[i].samples.is_empty();

        let found = match modality {
            Modality::Ecg => (0..channels.len()).find(|&i| usable(i) && is_cardiac(&label(i))),
            Modality::Eeg => (0..channels.len())
                .find(|&i| usable(i) && label(i).contains("eeg"))
                .or_else(|| (0..channels.len()).find(|&i| usable(i) && !is_cardiac(&label(i)))),
        };
        found.ok_or_else(|| CbError::format(format!("no {} channels found in the EDF file", modality)))
    }
}

impl FormatHandler for EdfHandler {
    fn format_id(&self) -> DataFormat {
        DataFormat::Edf
    }

    fn parse(&self, bytes: &[u8], options: &LoadOptions) -> CbResult<Signal> {
        if bytes.len() < EDF_HEADER_LEN {
            return Err(CbError::format("file is too short to be EDF"));
        }
        let mut channels = Self::channels(bytes)?;
        let index = Self::select_channel(&channels, options.modality)?;
        let channel = channels.swap_remove(index);
        debug!("Using EDF channel '{}' at {}Hz", channel.label, channel.sampling_rate);

        let rate = options.sampling_rate.unwrap_or(channel.sampling_rate);
        Signal::new(channel.samples, rate, options.modality)
    }
}
