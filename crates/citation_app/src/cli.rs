use std::path::PathBuf;
use std::time::Duration;

use citation_core::DocumentSource;
use citation_engine::{ExportFormat, ExportOptions, FetchSettings};
use clap::{ArgAction, Parser};
use engine_logging::LogDestination;
use log::LevelFilter;

/// Extract the citations of a shared ChatGPT conversation into a table.
#[derive(Parser, Debug)]
#[command(name = "cite-harvest", version, about, long_about = None)]
pub(crate) struct Args {
    /// Share link, e.g. https://chatgpt.com/share/...
    #[arg(required_unless_present = "html_file", conflicts_with = "html_file")]
    pub url: Option<String>,

    /// Read an already rendered page from disk instead of fetching it.
    #[arg(long, value_name = "PATH")]
    pub html_file: Option<PathBuf>,

    /// Directory the export is written to.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Export file name without extension.
    #[arg(long, default_value = "chatgpt_citations")]
    pub file_stem: String,

    /// Export format: csv or json.
    #[arg(short, long, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Accept any http(s) URL, not only share links.
    #[arg(long)]
    pub allow_any_url: bool,

    /// Overall request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Do not print the preview table.
    #[arg(long)]
    pub no_preview: bool,

    /// Also write logs to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn source(&self) -> Option<DocumentSource> {
        match (&self.html_file, &self.url) {
            (Some(path), _) => Some(DocumentSource::SavedPage(path.clone())),
            (None, Some(url)) => Some(DocumentSource::ShareUrl(url.clone())),
            (None, None) => None,
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.timeout_secs.max(1)),
            ..FetchSettings::default()
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            output_dir: self.output_dir.clone(),
            file_stem: self.file_stem.clone(),
            format: self.format,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}
