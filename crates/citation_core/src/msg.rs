use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked for citations from a share URL or a saved page.
    SourceSubmitted(crate::DocumentSource),
    /// The document could not be retrieved; extraction never ran.
    DocumentFailed(String),
    /// Extraction finished; an empty list is a valid result.
    CitationsExtracted(Vec<crate::CitationRow>),
    /// Export file written to disk.
    ExportWritten(PathBuf),
    /// Export could not be encoded or written.
    ExportFailed(String),
    /// Fallback for placeholder wiring.
    NoOp,
}
