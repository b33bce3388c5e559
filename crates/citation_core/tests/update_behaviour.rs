use std::path::PathBuf;
use std::sync::Once;

use citation_core::{
    update, AppState, BannerLevel, CitationRow, DocumentSource, Effect, Msg, Outcome, Phase,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

const SHARE: &str = "https://chatgpt.com/share/6650-abcd";

fn row(url: &str, id: &str) -> CitationRow {
    CitationRow {
        text: "Label".to_string(),
        url: url.to_string(),
        domain: "example.com".to_string(),
        citation_id: id.to_string(),
        confidence: String::new(),
    }
}

fn submit(state: AppState, url: &str) -> (AppState, Vec<Effect>) {
    update(state, Msg::SourceSubmitted(DocumentSource::ShareUrl(url.to_string())))
}

#[test]
fn valid_share_url_starts_fetch() {
    init_logging();
    let (mut state, effects) = submit(AppState::new(), &format!("  {SHARE}\n"));

    assert_eq!(
        effects,
        vec![Effect::FetchAndExtract(DocumentSource::ShareUrl(
            SHARE.to_string()
        ))]
    );
    let view = state.view();
    assert_eq!(view.phase, Phase::Fetching);
    assert_eq!(view.source.as_deref(), Some(SHARE));
    assert_eq!(view.status.as_deref(), Some("Loading shared conversation..."));
    assert!(view.banner.is_none());
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn foreign_url_is_rejected_without_effects() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "https://example.com/share/abc");

    assert!(effects.is_empty());
    assert!(matches!(state.outcome(), Some(Outcome::InvalidSource(_))));
    let banner = state.view().banner.expect("banner");
    assert_eq!(banner.level, BannerLevel::Error);
    assert!(banner.message.contains("share URL"));
}

#[test]
fn relaxed_state_accepts_other_sites() {
    init_logging();
    let (state, effects) = submit(AppState::allowing_any_url(), "https://example.com/chat/9");
    assert_eq!(state.phase(), Phase::Fetching);
    assert_eq!(effects.len(), 1);
}

#[test]
fn saved_page_skips_url_validation() {
    init_logging();
    let path = PathBuf::from("saved/share.html");
    let (state, effects) = update(
        AppState::new(),
        Msg::SourceSubmitted(DocumentSource::SavedPage(path.clone())),
    );
    assert_eq!(state.phase(), Phase::Fetching);
    assert_eq!(
        effects,
        vec![Effect::FetchAndExtract(DocumentSource::SavedPage(path))]
    );
}

#[test]
fn found_citations_are_exported_then_reported() {
    init_logging();
    let (state, _) = submit(AppState::new(), SHARE);
    let rows = vec![row("https://a.example/", "1"), row("https://b.example/", "")];

    let (state, effects) = update(state, Msg::CitationsExtracted(rows.clone()));
    assert_eq!(effects, vec![Effect::WriteExport]);
    assert_eq!(state.phase(), Phase::Exporting);
    assert_eq!(state.view().status.as_deref(), Some("Writing 2 citations..."));

    let path = PathBuf::from("out/chatgpt_citations.csv");
    let (state, effects) = update(state, Msg::ExportWritten(path.clone()));
    assert!(effects.is_empty());

    let view = state.view();
    assert_eq!(view.phase, Phase::Done);
    assert_eq!(view.rows, rows);
    assert_eq!(view.export_path, Some(path));
    let banner = view.banner.expect("banner");
    assert_eq!(banner.level, BannerLevel::Success);
    assert_eq!(banner.message, "Found 2 unique citations.");
}

#[test]
fn empty_result_differs_from_acquisition_failure() {
    init_logging();
    let (state, _) = submit(AppState::new(), SHARE);
    let (empty, effects) = update(state.clone(), Msg::CitationsExtracted(Vec::new()));
    assert!(effects.is_empty());
    assert_eq!(empty.outcome(), Some(&Outcome::NoCitations));

    let (failed, _) = update(state, Msg::DocumentFailed("http status 403".to_string()));
    assert!(matches!(failed.outcome(), Some(Outcome::AcquisitionFailed(_))));

    let empty_banner = empty.view().banner.expect("banner");
    let failed_banner = failed.view().banner.expect("banner");
    assert_eq!(empty_banner.level, BannerLevel::Warning);
    assert_eq!(failed_banner.level, BannerLevel::Error);
    assert_ne!(empty_banner.message, failed_banner.message);
    assert!(failed_banner.message.contains("http status 403"));
}

#[test]
fn export_failure_keeps_rows_for_preview() {
    init_logging();
    let (state, _) = submit(AppState::new(), SHARE);
    let (state, _) = update(
        state,
        Msg::CitationsExtracted(vec![row("https://a.example/", "1")]),
    );
    let (state, _) = update(state, Msg::ExportFailed("disk full".to_string()));

    let view = state.view();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.export_path, None);
    let banner = view.banner.expect("banner");
    assert_eq!(banner.level, BannerLevel::Error);
    assert!(banner.message.contains("disk full"));
}

#[test]
fn submissions_are_ignored_while_busy() {
    init_logging();
    let (state, _) = submit(AppState::new(), SHARE);
    let (state, effects) = submit(state, "https://chatgpt.com/share/other");

    assert!(effects.is_empty());
    assert_eq!(state.view().source.as_deref(), Some(SHARE));
}

#[test]
fn stray_results_outside_their_phase_are_ignored() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::CitationsExtracted(vec![row("https://a.example/", "1")]),
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Idle);

    let (state, _) = update(state, Msg::ExportWritten(PathBuf::from("x.csv")));
    assert_eq!(state.phase(), Phase::Idle);
    assert!(state.outcome().is_none());
}

#[test]
fn finished_session_can_start_again() {
    init_logging();
    let (state, _) = submit(AppState::new(), SHARE);
    let (state, _) = update(state, Msg::CitationsExtracted(Vec::new()));
    let (state, effects) = submit(state, SHARE);

    assert_eq!(effects.len(), 1);
    assert_eq!(state.phase(), Phase::Fetching);
    assert!(state.outcome().is_none());
}
