use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kokorofile::artifacts::ArtifactStore;
use kokorofile::audio;
use kokorofile::backends::{KokoroBackend, SynthesisBackend, SynthesisRequest};
use kokorofile::error::KokoroError;
use kokorofile::input::read_input_text;
use kokorofile::server::{self, AppState, ServerSettings};
use kokorofile::settings::Settings;

/// Convert text to speech using the Kokoro engine
#[derive(Parser, Debug)]
#[command(name = "kokorofile")]
#[command(version)]
#[command(about = "Convert text to speech using the Kokoro engine", long_about = None)]
struct Cli {
    /// Input text or file path (if not provided, reads from stdin)
    input: Option<String>,

    /// Output file path (if not provided, plays through an audio device)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Audio device ID to use for playback
    #[arg(short, long)]
    device: Option<usize>,

    /// List available audio output devices
    #[arg(short, long)]
    list_devices: bool,

    /// Override the default cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override the default data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Voice to use
    #[arg(long)]
    voice: Option<String>,

    /// Speech speed multiplier
    #[arg(long)]
    speed: Option<f32>,

    /// Language code
    #[arg(long)]
    lang: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Run as HTTP server
    #[arg(long)]
    server: bool,

    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli).await {
        error!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "kokorofile=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), KokoroError> {
    if cli.list_devices {
        // Listing never touches the synthesis path, so no model download.
        println!("Available audio devices:");
        for (id, name) in audio::output_devices()? {
            println!("  {id}: {name}");
        }
        return Ok(());
    }

    let settings = load_settings(&cli)?;

    if cli.server {
        let state = build_server_state(&settings).await?;
        return server::serve(state, &settings.host, settings.port).await;
    }

    synthesize_once(cli, settings).await
}

/// Layered settings with command-line flags applied on top.
fn load_settings(cli: &Cli) -> Result<Settings, KokoroError> {
    let mut settings = Settings::new()?;

    if let Some(dir) = &cli.cache_dir {
        settings.cache_dir = dir.clone();
    }
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(voice) = &cli.voice {
        settings.voice = voice.clone();
    }
    if let Some(speed) = cli.speed {
        settings.speed = speed;
    }
    if let Some(lang) = &cli.lang {
        settings.lang = lang.clone();
    }
    if let Some(host) = &cli.host {
        settings.host = host.clone();
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }

    settings.validate()?;
    Ok(settings)
}

/// Resolve artifacts and construct the engine handle, once per process.
async fn build_backend(settings: Settings) -> Result<Arc<dyn SynthesisBackend>, KokoroError> {
    tokio::task::spawn_blocking(move || -> Result<Arc<dyn SynthesisBackend>, KokoroError> {
        settings.ensure_dirs()?;
        let artifacts = ArtifactStore::new(&settings).resolve()?;
        let backend = KokoroBackend::new(settings.engine_binary.clone(), artifacts)?;
        Ok(Arc::new(backend) as Arc<dyn SynthesisBackend>)
    })
    .await
    .map_err(|e| KokoroError::Synthesis(format!("initialization task failed: {e}")))?
}

async fn build_server_state(settings: &Settings) -> Result<Arc<AppState>, KokoroError> {
    let backend = build_backend(settings.clone()).await?;
    info!("Loaded synthesis backend '{}'", backend.id());

    let initial = ServerSettings {
        lang_code: settings.lang.clone(),
        voice: settings.voice.clone(),
    };
    Ok(Arc::new(AppState::new(backend, initial)))
}

async fn synthesize_once(cli: Cli, settings: Settings) -> Result<(), KokoroError> {
    let text = read_input_text(cli.input.as_deref(), &mut std::io::stdin())?;

    let request = SynthesisRequest::new(
        text,
        settings.voice.clone(),
        settings.speed,
        settings.lang.clone(),
    )?;
    let backend = build_backend(settings).await?;

    let output = cli.output;
    let device = cli.device;
    tokio::task::spawn_blocking(move || -> Result<(), KokoroError> {
        let buffer = backend.synthesize(&request)?;
        match output {
            Some(path) => {
                audio::save_wav(&buffer, &path)?;
                println!("Audio saved to {}", path.display());
                Ok(())
            }
            None => audio::play(&buffer, device),
        }
    })
    .await
    .map_err(|e| KokoroError::Synthesis(format!("synthesis task failed: {e}")))?
}
