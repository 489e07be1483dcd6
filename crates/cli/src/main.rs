#![deny(warnings)]

use anyhow::Context;
use asr_pilot_core::audio;
use asr_pilot_core::config::{
    parse_provider, resolve_endpoint, resolve_string_with_default, AppConfig, Env, StdEnv,
    DEFAULT_DIFF_BASE_URL, DEFAULT_MANIFEST, DEFAULT_OUTPUT_DIR, DEFAULT_REPORT_DIR,
    DEFAULT_WHISPER_COMMAND, ENV_WHISPER_COMMAND,
};
use asr_pilot_core::manifest::load_manifest;
use asr_pilot_core::provider::{
    RemoteJobProvider, TranscriptionProvider, WhisperCliEngine, WhisperProvider,
};
use asr_pilot_core::report::Reporter;
use asr_pilot_core::runner::{run_and_report, RunOutcome};
use asr_pilot_core::transcript::ProviderKind;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "asr-pilot")]
#[command(about = "Benchmark speech-to-text services against reference transcripts")]
struct Args {
    /// Service to benchmark: whisper, google or aws.
    #[arg(long)]
    provider: String,

    /// CSV listing media files and their reference transcripts.
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,

    /// Where diff pages and raw transcript artifacts land.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Where the report CSV lands.
    #[arg(long, default_value = DEFAULT_REPORT_DIR)]
    report_dir: PathBuf,

    /// Public URL prefix the report's diff links point at.
    #[arg(long, default_value = DEFAULT_DIFF_BASE_URL)]
    diff_base_url: String,

    #[arg(long)]
    whisper_command: Option<String>,

    /// Job API endpoint, required for the cloud providers.
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(args, &env)?;

    tracing::info!(
        provider = %cfg.provider,
        manifest = %cfg.manifest.display(),
        output_dir = %cfg.output_dir.display(),
        "config loaded"
    );

    run(cfg).await
}

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let files = load_manifest(&cfg.manifest)
        .with_context(|| format!("failed to load manifest {}", cfg.manifest.display()))?;
    tracing::info!(files = files.len(), "manifest loaded");

    let provider = build_provider(&cfg)?;
    let mut reporter = Reporter::new(cfg.output_dir.clone(), cfg.diff_base_url.clone())?;

    let (outcomes, csv_path) =
        run_and_report(provider.as_ref(), &files, &mut reporter, &cfg.report_dir).await?;

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, RunOutcome::Completed(_)))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, RunOutcome::Skipped { .. }))
        .count();
    let failed = outcomes.len() - completed - skipped;

    tracing::info!(
        completed,
        skipped,
        failed,
        report = %csv_path.display(),
        "benchmark finished"
    );
    if failed > 0 {
        // Per-combination failures are already logged and absent from the
        // report; the batch itself still succeeded.
        tracing::warn!(failed, "some runs failed and were left out of the report");
    }
    Ok(())
}

fn build_provider(cfg: &AppConfig) -> anyhow::Result<Box<dyn TranscriptionProvider>> {
    match cfg.provider {
        ProviderKind::Whisper => {
            audio::ensure_ffmpeg_available()?;
            let engine = WhisperCliEngine::new(&cfg.whisper_command);
            Ok(Box::new(WhisperProvider::new(engine)))
        }
        kind => {
            let endpoint = cfg
                .endpoint
                .clone()
                .with_context(|| format!("no endpoint configured for provider {kind}"))?;
            Ok(Box::new(RemoteJobProvider::new(kind, endpoint)))
        }
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: Args, env: &impl Env) -> anyhow::Result<AppConfig> {
    let provider = parse_provider(&args.provider)?;
    let endpoint = resolve_endpoint(args.endpoint, provider, env)?;
    let whisper_command = resolve_string_with_default(
        args.whisper_command,
        ENV_WHISPER_COMMAND,
        env,
        DEFAULT_WHISPER_COMMAND,
    );

    Ok(AppConfig {
        manifest: args.manifest,
        output_dir: args.output_dir,
        report_dir: args.report_dir,
        provider,
        diff_base_url: args.diff_base_url,
        whisper_command,
        endpoint,
    })
}
