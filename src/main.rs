use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use streaming_asr::asr::{AsrFactory, AsrService, Resource, Transcript};
use streaming_asr::audio::WavSource;
use streaming_asr::config_manager::{Config, ModelManifest};

#[derive(Parser, Debug)]
#[command(
    name = "streaming-asr",
    about = "Stream a WAV file through a speech recognition backend"
)]
struct Args {
    /// Backend tag or model name (defaults to asr_config.backend from the config file)
    resource: Option<String>,

    /// YAML or JSON config file (falls back to $CONFIG_PATH)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WAV file to transcribe
    #[arg(short, long)]
    wav: Option<PathBuf>,

    /// List known model names and exit
    #[arg(long)]
    list_models: bool,

    /// Print each transcript as a JSON line
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streaming_asr=info")),
        )
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("CONFIG_PATH").ok().map(PathBuf::from));
    let config = match &config_path {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            info!("Loaded configuration from: {}", path.display());
            Some(config)
        }
        None => None,
    };

    let manifest = config
        .as_ref()
        .map(Config::manifest)
        .unwrap_or_else(ModelManifest::builtin);

    if args.list_models {
        list_models(&manifest);
        return Ok(());
    }

    let resource = match (args.resource.as_deref(), config) {
        (Some(name), Some(config)) => {
            let mut asr_config = config.asr_config;
            asr_config.backend = name.to_string();
            Resource::Config(asr_config)
        }
        (Some(name), None) => Resource::from(name),
        (None, Some(config)) => Resource::Config(config.asr_config),
        (None, None) => anyhow::bail!("No resource given and no config file to read one from"),
    };

    let factory = AsrFactory::with_defaults().with_models(manifest);
    let mut service = factory.resolve(resource)?;
    info!(
        "ASR ready: {} Hz, {}s chunks ({} samples), classification={}",
        service.sample_rate(),
        service.frame_length(),
        service.chunk_size(),
        service.is_classification()
    );

    let wav = args
        .wav
        .context("--wav is required; live capture is not supported")?;
    let source = WavSource::open(&wav)?;
    info!("Streaming {} ({:.1}s)", wav.display(), source.duration());

    for chunk in source.chunks_for(&*service)? {
        for transcript in service.transcribe(chunk)? {
            print_transcript(&transcript, &*service, args.json)?;
        }
    }
    for transcript in service.finish()? {
        print_transcript(&transcript, &*service, args.json)?;
    }

    Ok(())
}

fn list_models(manifest: &ModelManifest) {
    for entry in manifest.entries() {
        println!(
            "{:<16} {:<12} {:<15} {} Hz, {}s chunks",
            entry.name,
            entry.backend,
            entry.model.kind.as_str(),
            entry.streaming.sample_rate,
            entry.streaming.frame_length
        );
    }
}

fn print_transcript(transcript: &Transcript, service: &dyn AsrService, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(transcript)?);
    } else if service.is_classification() {
        println!(
            "{} ({:.3})",
            transcript.text,
            transcript.confidence.unwrap_or_default()
        );
    } else if transcript.end {
        println!("[final]   {}", transcript.text);
    } else {
        println!("[partial] {}", transcript.text);
    }
    Ok(())
}
