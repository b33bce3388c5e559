use crate::state::validate_share_url;
use crate::{AppState, DocumentSource, Effect, Msg, Outcome, Phase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SourceSubmitted(source) => {
            if state.is_busy() {
                return (state, Vec::new());
            }
            let source = match source {
                DocumentSource::ShareUrl(raw) => {
                    match validate_share_url(&raw, state.require_share_url()) {
                        Ok(url) => DocumentSource::ShareUrl(url),
                        Err(reason) => {
                            state.finish(Outcome::InvalidSource(reason));
                            return (state, Vec::new());
                        }
                    }
                }
                saved @ DocumentSource::SavedPage(_) => saved,
            };
            state.begin_fetch(source.clone());
            vec![Effect::FetchAndExtract(source)]
        }
        Msg::DocumentFailed(reason) => {
            if state.phase() == Phase::Fetching {
                state.finish(Outcome::AcquisitionFailed(reason));
            }
            Vec::new()
        }
        Msg::CitationsExtracted(rows) => {
            if state.phase() != Phase::Fetching {
                return (state, Vec::new());
            }
            if rows.is_empty() {
                state.finish(Outcome::NoCitations);
                Vec::new()
            } else {
                state.begin_export(rows);
                vec![Effect::WriteExport]
            }
        }
        Msg::ExportWritten(path) => {
            if state.phase() == Phase::Exporting {
                let count = state.rows().len();
                state.set_export_path(path);
                state.finish(Outcome::Found { count });
            }
            Vec::new()
        }
        Msg::ExportFailed(reason) => {
            if state.phase() == Phase::Exporting {
                state.finish(Outcome::ExportFailed(reason));
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
