use std::collections::VecDeque;
use std::process::ExitCode;

use citation_core::{update, AppState, Msg, Outcome};
use engine_logging::engine_info;

use crate::cli::Args;
use crate::effects::EffectRunner;
use crate::render;

pub fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let source = args
        .source()
        .ok_or_else(|| anyhow::anyhow!("either a share URL or --html-file is required"))?;
    let mut runner = EffectRunner::new(args.fetch_settings(), args.export_options())?;
    let mut state = if args.allow_any_url {
        AppState::allowing_any_url()
    } else {
        AppState::new()
    };

    let mut inbox = VecDeque::from([Msg::SourceSubmitted(source)]);
    while let Some(msg) = inbox.pop_front() {
        let (next, effects) = update(state, msg);
        state = next;
        if state.consume_dirty() {
            if let Some(status) = state.view().status {
                eprintln!("{status}");
            }
        }
        for effect in effects {
            inbox.extend(runner.run(effect));
        }
    }

    let view = state.view();
    print!("{}", render::report(&view, !args.no_preview));

    let code = exit_code(state.outcome());
    engine_info!("Finished with outcome {:?}", state.outcome());
    Ok(code)
}

fn exit_code(outcome: Option<&Outcome>) -> ExitCode {
    match outcome {
        Some(Outcome::Found { .. }) | Some(Outcome::NoCitations) => ExitCode::SUCCESS,
        Some(Outcome::InvalidSource(_)) => ExitCode::from(2),
        Some(Outcome::AcquisitionFailed(_)) => ExitCode::from(3),
        Some(Outcome::ExportFailed(_)) => ExitCode::from(4),
        None => ExitCode::FAILURE,
    }
}
