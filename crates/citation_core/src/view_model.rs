use std::path::PathBuf;

use crate::{CitationRow, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub level: BannerLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub source: Option<String>,
    /// Transient progress text while work is in flight.
    pub status: Option<String>,
    pub banner: Option<Banner>,
    pub rows: Vec<CitationRow>,
    pub export_path: Option<PathBuf>,
    pub dirty: bool,
}
