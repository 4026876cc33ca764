//! Offline renderer CLI: settings JSON in, WAV out.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use binaural_core::{CancelToken, EngineConfig, OfflineRenderer, Result, Settings};

#[derive(Parser)]
#[command(name = "binaural-render")]
#[command(about = "Render a saved binaural session to a WAV file", long_about = None)]
struct Cli {
    /// Settings file exported by the player
    settings: PathBuf,

    /// Output WAV path
    #[arg(short, long, default_value = "output.wav")]
    output: PathBuf,

    /// Length in seconds (default: the duration stored in the settings)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Output sample rate in Hz (default: from the engine config)
    #[arg(short = 'r', long)]
    sample_rate: Option<u32>,

    /// Engine config JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the tanh soft clipper
    #[arg(long)]
    no_soft_clip: bool,

    /// Skip peak normalisation
    #[arg(long)]
    no_normalize: bool,

    /// Seed the noise generator for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }
    config.export.soft_clip &= !cli.no_soft_clip;
    config.export.normalize &= !cli.no_normalize;
    config.validate()?;

    let settings = Settings::load(&cli.settings)?;
    let duration = cli.duration.unwrap_or(settings.duration);
    let session = settings.to_session();
    info!(
        "{} tracks from {}, master volume {:.0}%",
        settings.tracks.len(),
        cli.settings.display(),
        settings.volume * 100.0
    );

    let mut renderer = match cli.seed {
        Some(seed) => OfflineRenderer::with_seed(&config, seed),
        None => OfflineRenderer::new(&config),
    };
    let mut last_decile = 0;
    let audio = renderer.render(&session, duration, &CancelToken::new(), |done, total| {
        let decile = done * 10 / total.max(1);
        if decile > last_decile {
            last_decile = decile;
            info!("{}% ({done}/{total} frames)", decile * 10);
        }
    })?;

    audio.write_wav(&cli.output)
}

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
