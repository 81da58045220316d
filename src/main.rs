use anyhow::{Context, Result};
use clap::Parser;
use euph_encoder::validation::validate_container;
use euph_encoder::{
    AudioMetadata, EncodePipeline, ExecutionContext, ModelRefs, PipelineConfig,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "euph-encoder")]
#[command(about = "Enhance an audio recording and encode it into a EUPH container", long_about = None)]
struct Args {
    /// Source audio file (or an existing .euph file with --validate)
    input: PathBuf,

    /// Output .euph path
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Genre label (detected automatically when omitted)
    #[arg(long)]
    genre: Option<String>,

    /// Tempo in BPM
    #[arg(long)]
    tempo: Option<f32>,

    /// Musical key
    #[arg(long)]
    key: Option<String>,

    /// Mood tag (can be specified multiple times)
    #[arg(long = "mood")]
    moods: Vec<String>,

    /// Energy in [0, 1]
    #[arg(long)]
    energy: Option<f32>,

    /// Valence in [0, 1]
    #[arg(long)]
    valence: Option<f32>,

    /// Model reference as NAME=PATH_OR_URL (can be specified multiple times)
    #[arg(long = "model")]
    models: Vec<String>,

    /// Stem mix profile (balanced, vocal, instrumental, bass_boost)
    #[arg(long, default_value = "balanced")]
    profile: String,

    /// Harmonic reconstruction strength
    #[arg(long, default_value = "0.3")]
    strength: f32,

    /// Target sample rate for super-resolution
    #[arg(long, default_value = "48000")]
    target_rate: u32,

    /// Only validate an existing container (don't encode)
    #[arg(long)]
    validate: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    // If validate-only mode, just validate and exit
    if args.validate {
        validate_container(&args.input)?;
        log::info!("✅ Validation completed!");
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .context("--output is required when encoding")?;

    let model_refs = parse_model_refs(&args.models)?;

    let config = PipelineConfig::new()
        .with_target_sample_rate(args.target_rate)
        .with_mix_profile(args.profile.clone())
        .with_harmonic_strength(args.strength);

    let ctx = ExecutionContext::new(model_refs.clone());
    let pipeline = EncodePipeline::new(config, &ctx);

    let buffer = euph_encoder::audio::load(&args.input)?;
    let mut metadata = AudioMetadata::for_buffer(&buffer);
    metadata.genre = args.genre.clone();
    metadata.tempo = args.tempo;
    metadata.key = args.key.clone();
    metadata.mood = if args.moods.is_empty() {
        None
    } else {
        Some(args.moods.clone())
    };
    metadata.energy = args.energy;
    metadata.valence = args.valence;

    let total = pipeline.encode_to_path(buffer, &mut metadata, &model_refs, &output)?;

    log::info!("Encoded {:?} -> {:?} ({} bytes)", args.input, output, total);
    if let Some(genre) = &metadata.genre {
        log::info!("Genre: {}", genre);
    }

    Ok(())
}

/// Parse repeated `NAME=PATH_OR_URL` entries into a model-reference map.
fn parse_model_refs(entries: &[String]) -> Result<ModelRefs> {
    let mut refs = ModelRefs::new();
    for entry in entries {
        let (name, reference) = entry.split_once('=').with_context(|| {
            format!("Invalid --model entry {:?} (expected NAME=PATH_OR_URL)", entry)
        })?;
        refs.insert(name.to_string(), reference.to_string());
    }
    Ok(refs)
}
