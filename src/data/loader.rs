use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::{Sample, ScratchDataset, SignalStore};
use super::normalize::{Normalization, RawTrace, normalize};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Loader options
// ---------------------------------------------------------------------------

/// Which header names hold the position and force columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub position: String,
    pub force: String,
    /// Optional reference trace, plotted but never interpolated.
    pub setpoint: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            position: "x".to_string(),
            force: "fIn".to_string(),
            setpoint: Some("fSet".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub columns: ColumnMapping,
    pub normalization: Normalization,
}

/// File extensions accepted as force data.
pub const DATA_EXTENSIONS: &[&str] = &["csv", "tsv"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a scratch-test force trace.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` – comma-separated, header row
/// * `.tsv` – tab-separated, header row
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<ScratchDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let delimiter = match ext.as_str() {
        "csv" => b',',
        "tsv" => b'\t',
        other => return Err(Error::UnsupportedFile(other.to_string())),
    };

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let trace = parse_trace(file, delimiter, &options.columns)?;
    let dataset = build_dataset(path, trace, &options.normalization)?;

    log::info!(
        "Loaded {} force samples from {} (range {:.1}..{:.1} µm)",
        dataset.forces.len(),
        path.display(),
        dataset.forces.range().0,
        dataset.forces.range().1
    );
    Ok(dataset)
}

/// Read the mapped columns out of delimited text with a header row.
pub fn parse_trace<R: Read>(reader: R, delimiter: u8, columns: &ColumnMapping) -> Result<RawTrace> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| Error::MalformedData(format!("reading header row: {e}")))?
        .clone();

    let find = |name: &str| headers.iter().position(|h| h == name);
    let pos_idx = find(&columns.position).ok_or_else(|| {
        Error::MalformedData(format!("missing '{}' column", columns.position))
    })?;
    let force_idx = find(&columns.force)
        .ok_or_else(|| Error::MalformedData(format!("missing '{}' column", columns.force)))?;
    let setpoint_idx = columns.setpoint.as_deref().and_then(find);

    let mut trace = RawTrace {
        position: Vec::new(),
        force: Vec::new(),
        setpoint: setpoint_idx.map(|_| Vec::new()),
    };

    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| Error::MalformedData(format!("row {row_no}: {e}")))?;
        let cell = |idx: usize, col: &str| -> Result<f64> {
            let raw = record.get(idx).unwrap_or("");
            raw.parse::<f64>().map_err(|_| {
                Error::MalformedData(format!("row {row_no}, {col}: '{raw}' is not a number"))
            })
        };

        trace.position.push(cell(pos_idx, &columns.position)?);
        trace.force.push(cell(force_idx, &columns.force)?);
        if let (Some(idx), Some(sp)) = (setpoint_idx, trace.setpoint.as_mut()) {
            sp.push(cell(idx, columns.setpoint.as_deref().unwrap_or_default())?);
        }
    }

    Ok(trace)
}

/// Normalise a raw trace read from `path` and validate it into a dataset.
pub fn build_dataset(path: &Path, trace: RawTrace, norm: &Normalization) -> Result<ScratchDataset> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let trace = normalize(trace, norm);

    let setpoint = trace.setpoint.as_ref().map(|sp| {
        trace
            .position
            .iter()
            .zip(sp)
            .map(|(&p, &f)| Sample::new(p, f))
            .collect()
    });
    let forces = SignalStore::load(trace.position.into_iter().zip(trace.force))?;

    Ok(ScratchDataset {
        path: path.to_path_buf(),
        name,
        forces,
        setpoint,
    })
}
