use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use engine_logging::engine_info;

use crate::persist::{write_atomically, PersistError};
use crate::types::CitationRecord;

pub const CSV_HEADER: [&str; 5] = ["Text", "URL", "Domain", "Citation ID", "Confidence"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format {other:?} (expected csv or json)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// File stem; the extension follows `format`.
    pub file_stem: String,
    pub format: ExportFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_stem: "chatgpt_citations".to_string(),
            format: ExportFormat::Csv,
        }
    }
}

impl ExportOptions {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.file_stem, self.format.extension())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Encode records as UTF-8 CSV with the fixed header row, CRLF line endings
/// and quoting only where a cell needs it.
pub fn encode_csv(records: &[CitationRecord]) -> Result<Vec<u8>, EncodeError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record([
            record.text.as_str(),
            record.url.as_str(),
            record.domain.as_str(),
            record.reference_id.as_str(),
            record.confidence.as_str(),
        ])?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|err| EncodeError::Io(std::io::Error::other(err.to_string())))
}

pub fn encode_json(records: &[CitationRecord]) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = serde_json::to_vec_pretty(records)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn encode(records: &[CitationRecord], format: ExportFormat) -> Result<Vec<u8>, EncodeError> {
    match format {
        ExportFormat::Csv => encode_csv(records),
        ExportFormat::Json => encode_json(records),
    }
}

/// Encode the whole list first, then persist it atomically. Nothing is written
/// when encoding fails.
pub fn write_export(
    records: &[CitationRecord],
    options: &ExportOptions,
) -> Result<PathBuf, ExportError> {
    let bytes = encode(records, options.format)?;
    let path = write_atomically(&options.output_dir, &options.file_name(), &bytes)?;
    engine_info!(
        "Wrote {} citations ({} bytes, {}) to {:?}",
        records.len(),
        bytes.len(),
        options.format,
        path
    );
    Ok(path)
}
