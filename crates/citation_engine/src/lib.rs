//! Citation engine: document acquisition, citation extraction and export.
mod decode;
mod dom;
mod engine;
mod export;
mod extract;
mod fetch;
mod persist;
mod types;

pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use dom::{DocumentTree, HtmlDocument};
pub use engine::EngineHandle;
pub use export::{
    encode, encode_csv, encode_json, write_export, EncodeError, ExportError, ExportFormat,
    ExportOptions, CSV_HEADER,
};
pub use extract::{
    domain_of, is_web_link, parse_confidence, parse_marker, Extractor, MarkerLinkExtractor,
    ReferenceMap,
};
pub use fetch::{DocumentProvider, FetchSettings, FileDocumentProvider, HttpDocumentProvider};
pub use persist::{ensure_output_dir, write_atomically, PersistError};
pub use types::{
    CitationRecord, DocumentMetadata, EngineEvent, FailureKind, FetchError, FetchedDocument,
    HarvestOutcome, HarvestSource, JobId, JobProgress, Stage, NO_TEXT_LABEL,
};

/// Extract citations from an HTML string with the default extractor.
pub fn extract_citations(html: &str) -> Vec<CitationRecord> {
    MarkerLinkExtractor.extract(html)
}
