//! stem-splitter CLI entry point

mod app;
mod cli;
mod config;
mod effects;
mod ui;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use splitter_engine::{EngineHandle, ReqwestApi, SeparationApi};
use splitter_logging::{level_for_verbosity, splitter_error, LogDestination};

use crate::app::{candidate_from_path, App, Goal};
use crate::cli::{Cli, Command};
use crate::config::ClientConfig;
use crate::effects::EffectRunner;
use crate::ui::render::RenderOptions;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            splitter_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when the logger could not be installed.
fn init_logging(cli: &Cli) -> bool {
    let installed = splitter_logging::initialize(
        LogDestination::from_log_file(cli.log_file.as_deref()),
        level_for_verbosity(cli.verbose),
    );
    if !installed {
        eprintln!("Warning: Could not initialize logging; continuing without log output");
    }
    installed
}

fn stem_url(config: &ClientConfig, job_id: &str, stem: &str) -> anyhow::Result<String> {
    let api = ReqwestApi::new(config.engine_config().api)?;
    Ok(api.stem_url(job_id, stem)?.to_string())
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    config.apply_cli(cli);
    let engine_config = config.engine_config();

    let goal = match &cli.command {
        Command::Url { job_id, stem } => {
            println!("{}", stem_url(&config, job_id, stem)?);
            return Ok(true);
        }
        Command::Separate { file } => Goal::Separate(candidate_from_path(file)?),
        Command::Jobs => Goal::History,
        Command::Health => Goal::Health,
        Command::Download { job_id, stem } => Goal::Download {
            job_id: job_id.clone(),
            stem: stem.clone(),
        },
        Command::Play { job_id, stem } => Goal::Play {
            job_id: job_id.clone(),
            stem: stem.clone(),
        },
    };

    let engine = EngineHandle::new(engine_config)?;
    let mut app = App::new(
        EffectRunner::new(engine),
        io::stdout().lock(),
        RenderOptions {
            api_base_url: config.api_base_url,
        },
    );
    Ok(app.run(&goal)?)
}
