use anyhow::Context;
use citation_core::{CitationRow, DocumentSource, Effect, Msg};
use citation_engine::{
    write_export, CitationRecord, DocumentMetadata, EngineEvent, EngineHandle, ExportOptions,
    FetchSettings, HarvestSource, JobId,
};
use engine_logging::{engine_debug, engine_info, engine_warn};

/// Executes core effects against the engine and turns the results back into
/// messages. Blocks until each effect has settled.
pub struct EffectRunner {
    engine: EngineHandle,
    export: ExportOptions,
    next_job_id: JobId,
    records: Vec<CitationRecord>,
}

impl EffectRunner {
    pub fn new(settings: FetchSettings, export: ExportOptions) -> anyhow::Result<Self> {
        let engine = EngineHandle::new(settings).context("failed to start engine runtime")?;
        Ok(Self {
            engine,
            export,
            next_job_id: 1,
            records: Vec::new(),
        })
    }

    pub fn run(&mut self, effect: Effect) -> Vec<Msg> {
        match effect {
            Effect::FetchAndExtract(source) => vec![self.harvest(source)],
            Effect::WriteExport => vec![self.export()],
        }
    }

    fn harvest(&mut self, source: DocumentSource) -> Msg {
        let job_id = self.next_job_id;
        self.next_job_id += 1;
        engine_info!("Harvest job_id={} source={}", job_id, source);
        self.engine.enqueue(job_id, map_source(source));

        while let Some(event) = self.engine.recv() {
            match event {
                EngineEvent::Progress(progress) if progress.job_id == job_id => {
                    engine_debug!(
                        "Job {} stage={:?} bytes={:?}",
                        job_id,
                        progress.stage,
                        progress.bytes
                    );
                }
                EngineEvent::JobCompleted { job_id: done, result } if done == job_id => {
                    return match result {
                        Ok(outcome) => {
                            engine_info!("Loaded {}", document_summary(&outcome.metadata));
                            let rows = outcome.records.iter().map(to_row).collect();
                            self.records = outcome.records;
                            Msg::CitationsExtracted(rows)
                        }
                        Err(err) => Msg::DocumentFailed(err.to_string()),
                    };
                }
                _ => {}
            }
        }
        Msg::DocumentFailed("engine stopped before the job finished".to_string())
    }

    fn export(&self) -> Msg {
        match write_export(&self.records, &self.export) {
            Ok(path) => Msg::ExportWritten(path),
            Err(err) => {
                engine_warn!("Export failed: {}", err);
                Msg::ExportFailed(err.to_string())
            }
        }
    }
}

fn map_source(source: DocumentSource) -> HarvestSource {
    match source {
        DocumentSource::ShareUrl(url) => HarvestSource::Url(url),
        DocumentSource::SavedPage(path) => HarvestSource::File(path),
    }
}

fn document_summary(metadata: &DocumentMetadata) -> String {
    let mut summary = format!(
        "{} ({} bytes, {})",
        metadata.final_url.as_deref().unwrap_or(&metadata.source),
        metadata.byte_len,
        metadata.encoding_label
    );
    if metadata.redirect_count > 0 {
        summary.push_str(&format!(" after {} redirect(s)", metadata.redirect_count));
    }
    summary
}

fn to_row(record: &CitationRecord) -> CitationRow {
    CitationRow {
        text: record.text.clone(),
        url: record.url.clone(),
        domain: record.domain.clone(),
        citation_id: record.reference_id.clone(),
        confidence: record.confidence.clone(),
    }
}
