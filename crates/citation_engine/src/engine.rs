use std::io;
use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::{engine_info, engine_warn};

use crate::extract::{Extractor, MarkerLinkExtractor};
use crate::fetch::{DocumentProvider, FetchSettings, FileDocumentProvider, HttpDocumentProvider};
use crate::{EngineEvent, FetchError, HarvestOutcome, HarvestSource, JobId, JobProgress, Stage};

enum EngineCommand {
    Harvest { job_id: JobId, source: HarvestSource },
}

struct Pipeline {
    http: Arc<dyn DocumentProvider>,
    files: Arc<dyn DocumentProvider>,
    extractor: Arc<dyn Extractor>,
}

impl Pipeline {
    fn provider_for(&self, source: &HarvestSource) -> (Arc<dyn DocumentProvider>, String) {
        match source {
            HarvestSource::Url(url) => (self.http.clone(), url.clone()),
            HarvestSource::File(path) => (self.files.clone(), path.display().to_string()),
        }
    }
}

/// Runs harvest jobs on a background thread with its own tokio runtime and
/// reports progress and results over a channel.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: FetchSettings) -> io::Result<Self> {
        let files = FileDocumentProvider::new(settings.max_bytes);
        Self::with_parts(
            Arc::new(HttpDocumentProvider::new(settings)),
            Arc::new(files),
            Arc::new(MarkerLinkExtractor),
        )
    }

    pub fn with_parts(
        http: Arc<dyn DocumentProvider>,
        files: Arc<dyn DocumentProvider>,
        extractor: Arc<dyn Extractor>,
    ) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let pipeline = Arc::new(Pipeline {
            http,
            files,
            extractor,
        });

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let pipeline = pipeline.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(pipeline.as_ref(), command, event_tx).await;
                });
            }
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn enqueue(&self, job_id: JobId, source: HarvestSource) {
        let _ = self.cmd_tx.send(EngineCommand::Harvest { job_id, source });
    }

    /// Blocks until the next event; `None` once the worker has shut down.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}

async fn handle_command(
    pipeline: &Pipeline,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Harvest { job_id, source } => {
            let progress = |stage: Stage, bytes: Option<u64>| {
                let _ = event_tx.send(EngineEvent::Progress(JobProgress {
                    job_id,
                    stage,
                    bytes,
                }));
            };

            progress(Stage::Fetching, None);
            let (provider, location) = pipeline.provider_for(&source);
            let result: Result<HarvestOutcome, FetchError> =
                match provider.fetch_document(&location).await {
                    Ok(document) => {
                        progress(Stage::Extracting, Some(document.metadata.byte_len));
                        let records = pipeline.extractor.extract(&document.html);
                        engine_info!("Job {} found {} citations in {}", job_id, records.len(), source);
                        progress(Stage::Done, Some(document.metadata.byte_len));
                        Ok(HarvestOutcome {
                            metadata: document.metadata,
                            records,
                        })
                    }
                    Err(err) => {
                        engine_warn!("Job {} could not load {}: {}", job_id, source, err);
                        Err(err)
                    }
                };
            let _ = event_tx.send(EngineEvent::JobCompleted { job_id, result });
        }
    }
}
