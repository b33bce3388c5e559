#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchAndExtract(crate::DocumentSource),
    /// Encode the extracted citations and write them out.
    WriteExport,
}
