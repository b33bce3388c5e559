use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::view_model::{AppViewModel, Banner, BannerLevel};

/// Public conversation links all live under this prefix.
pub const SHARE_URL_PREFIX: &str = "https://chatgpt.com/share/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    ShareUrl(String),
    SavedPage(PathBuf),
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::ShareUrl(url) => write!(f, "{url}"),
            DocumentSource::SavedPage(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One citation as shown in the preview table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationRow {
    pub text: String,
    pub url: String,
    pub domain: String,
    pub citation_id: String,
    pub confidence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    Exporting,
    Done,
}

/// How a finished session ended. `NoCitations` and `AcquisitionFailed` must
/// never render the same message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found { count: usize },
    NoCitations,
    InvalidSource(String),
    AcquisitionFailed(String),
    ExportFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    phase: Phase,
    require_share_url: bool,
    source: Option<DocumentSource>,
    rows: Vec<CitationRow>,
    outcome: Option<Outcome>,
    export_path: Option<PathBuf>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            require_share_url: true,
            source: None,
            rows: Vec::new(),
            outcome: None,
            export_path: None,
            dirty: false,
        }
    }

    /// Accept any http(s) URL instead of share links only.
    pub fn allowing_any_url() -> Self {
        Self {
            require_share_url: false,
            ..Self::new()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn rows(&self) -> &[CitationRow] {
        &self.rows
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Fetching | Phase::Exporting)
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase,
            source: self.source.as_ref().map(ToString::to_string),
            status: self.status_line(),
            banner: self.outcome.as_ref().map(|o| self.banner_for(o)),
            rows: self.rows.clone(),
            export_path: self.export_path.clone(),
            dirty: self.dirty,
        }
    }

    pub(crate) fn require_share_url(&self) -> bool {
        self.require_share_url
    }

    pub(crate) fn begin_fetch(&mut self, source: DocumentSource) {
        self.phase = Phase::Fetching;
        self.source = Some(source);
        self.rows.clear();
        self.outcome = None;
        self.export_path = None;
        self.mark_dirty();
    }

    pub(crate) fn begin_export(&mut self, rows: Vec<CitationRow>) {
        self.phase = Phase::Exporting;
        self.rows = rows;
        self.mark_dirty();
    }

    pub(crate) fn finish(&mut self, outcome: Outcome) {
        self.phase = Phase::Done;
        self.outcome = Some(outcome);
        self.mark_dirty();
    }

    pub(crate) fn set_export_path(&mut self, path: PathBuf) {
        self.export_path = Some(path);
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn status_line(&self) -> Option<String> {
        match self.phase {
            Phase::Fetching => Some("Loading shared conversation...".to_string()),
            Phase::Exporting => Some(format!("Writing {} citations...", self.rows.len())),
            Phase::Idle | Phase::Done => None,
        }
    }

    fn banner_for(&self, outcome: &Outcome) -> Banner {
        match outcome {
            Outcome::Found { count } => Banner {
                level: BannerLevel::Success,
                message: format!("Found {count} unique citations."),
            },
            Outcome::NoCitations => Banner {
                level: BannerLevel::Warning,
                message: "No citations found.".to_string(),
            },
            Outcome::InvalidSource(reason) => Banner {
                level: BannerLevel::Error,
                message: reason.clone(),
            },
            Outcome::AcquisitionFailed(reason) => Banner {
                level: BannerLevel::Error,
                message: format!("Could not load the conversation: {reason}"),
            },
            Outcome::ExportFailed(reason) => Banner {
                level: BannerLevel::Error,
                message: format!(
                    "Found {} citations but the export could not be written: {reason}",
                    self.rows.len()
                ),
            },
        }
    }
}

/// Checks a user-supplied link and returns it trimmed.
///
/// With `require_share` the link must sit under [`SHARE_URL_PREFIX`];
/// otherwise any absolute http(s) URL is accepted.
pub fn validate_share_url(raw: &str, require_share: bool) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Please enter a conversation link.".to_string());
    }
    if require_share {
        if !trimmed.starts_with(SHARE_URL_PREFIX) {
            return Err(format!(
                "Please enter a valid ChatGPT share URL (starting with {SHARE_URL_PREFIX})."
            ));
        }
        return Ok(trimmed.to_string());
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        Ok(url) => Err(format!("Unsupported URL scheme {:?}.", url.scheme())),
        Err(err) => Err(format!("Not a valid URL: {err}.")),
    }
}
