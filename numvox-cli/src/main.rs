use anyhow::{bail, Context, Result};
use clap::Parser;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use numvox_core::{
    archive::{create_archive, DEFAULT_ARCHIVE_NAME},
    batch::{BatchOptions, BatchRunner, BatchSummary},
    dispatch::Dispatcher,
    events::EventSender,
    layout::OutputLayout,
    range::{NumberRange, MAX_NUMBER, MIN_NUMBER},
    report::SummaryReport,
    settings::SettingsManager,
    tts::{build_provider, ProviderKind, TextToSpeech, VoiceChoice},
    vibes::{preview, resolve_style, StyleSelection, VibeLibrary},
};

mod progress;
mod voice_select;

#[derive(Parser, Debug)]
#[command(name = "numvox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Render a range of numbers as spoken-word WAV files")]
struct Args {
    /// Speech provider: openai, elevenlabs or polly
    #[arg(long, default_value = "openai")]
    provider: ProviderKind,

    /// Voice name (OpenAI) or voice id (ElevenLabs, Polly)
    #[arg(long)]
    voice: Option<String>,

    /// Provider model id
    #[arg(long)]
    model: Option<String>,

    /// First number to generate
    #[arg(long, default_value_t = MIN_NUMBER)]
    start: u32,

    /// Last number to generate (inclusive)
    #[arg(long, default_value_t = MAX_NUMBER)]
    end: u32,

    /// Seconds to wait between requests (provider default when omitted)
    #[arg(long)]
    delay: Option<f64>,

    /// Directory for the WAV files (settings file value when omitted)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path of the zip archive
    #[arg(long, default_value = DEFAULT_ARCHIVE_NAME)]
    zip_name: PathBuf,

    /// Style prompt passed to the provider
    #[arg(long)]
    vibe: Option<String>,

    /// JSON file of style prompts; combine with --vibe-key
    #[arg(long, value_name = "PATH")]
    vibe_file: Option<PathBuf>,

    /// Key of the general prompt to use from --vibe-file
    #[arg(long, value_name = "KEY")]
    vibe_key: Option<String>,

    /// List the prompts in --vibe-file and exit
    #[arg(long)]
    list_vibes: bool,

    /// List the provider's voices and exit
    #[arg(long)]
    list_voices: bool,

    /// Settings file (defaults to ~/.numvox/settings.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Text log file
    #[arg(long, default_value = "tts_generation.log")]
    log_file: PathBuf,

    /// Skip creating the zip archive
    #[arg(long)]
    no_archive: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = setup_tracing(&args.log_file)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let local = tokio::task::LocalSet::new();
        local.run_until(async_main(args)).await
    })
}

async fn async_main(args: Args) -> Result<()> {
    let started = Instant::now();

    let library = args
        .vibe_file
        .as_deref()
        .map(VibeLibrary::load)
        .transpose()?;

    if args.list_vibes {
        let Some(library) = &library else {
            bail!("--list-vibes requires --vibe-file");
        };
        for line in library.listing() {
            println!("{line}");
        }
        return Ok(());
    }

    let style = resolve_style(
        library.as_ref(),
        &StyleSelection {
            vibe: args.vibe.clone(),
            vibe_key: args.vibe_key.clone(),
        },
    )?;

    let range = NumberRange::new(args.start, args.end)?;

    let settings_manager = match &args.config {
        Some(path) => SettingsManager::from_path(path.clone())?,
        None => SettingsManager::new()?,
    };
    let settings = settings_manager.settings().clone();
    info!(path = ?settings_manager.path(), "Loaded settings");

    let mut choice = VoiceChoice {
        voice: args.voice.clone(),
        model: args.model.clone(),
    };

    if args.list_voices {
        let provider = build_provider(args.provider, &settings, &choice).await?;
        print_voices(provider.as_ref()).await?;
        return Ok(());
    }

    let mut provider = build_provider(args.provider, &settings, &choice).await?;
    if args.provider.needs_voice_selection(&settings, &choice) {
        let voices = provider
            .list_voices()
            .await
            .context("Failed to list voices")?;
        let voice_id = voice_select::select_voice(&voices)?;
        choice.voice = Some(voice_id);
        provider = build_provider(args.provider, &settings, &choice).await?;
    }

    if let Some(style) = &style {
        if provider.supports_style() {
            info!("Using vibe prompt: {}", preview(style));
        } else {
            warn!(
                provider = provider.name(),
                "Vibe prompt specified but the selected provider/model ignores it"
            );
        }
    }

    let delay = match args.delay {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Invalid --delay value: {secs}"))?,
        None => args.provider.default_delay(&settings),
    };
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| settings.output_dir.clone());

    info!("Starting TTS number generator");
    info!("Range: {range}");
    info!(
        provider = provider.name(),
        voice = choice.voice.as_deref().unwrap_or("default"),
        model = choice.model.as_deref().unwrap_or("default"),
        "Voice configuration"
    );

    let layout = OutputLayout::new(output_dir);
    let options = BatchOptions {
        delay,
        retry_rounds: settings.retry.retry_rounds,
        retry_pause: settings.retry.retry_pause(),
    };

    let (events, event_rx) = EventSender::new();
    let progress = tokio::task::spawn_local(progress::render(event_rx));

    let dispatcher = Dispatcher::new(provider, settings.retry.policy()).with_style(style);
    let runner = BatchRunner::new(dispatcher, layout.clone(), options).with_events(events);

    let summary = until_interrupted(generate(&runner, range), tokio::signal::ctrl_c()).await?;

    drop(runner);
    wait_for_renderer(progress).await;

    let archive_path = (!args.no_archive).then_some(args.zip_name.as_path());
    for line in finish_run(range, &layout, &summary, archive_path) {
        info!("{line}");
    }

    info!(
        "Total execution time: {:.1} minutes",
        started.elapsed().as_secs_f64() / 60.0
    );
    Ok(())
}

async fn generate(runner: &BatchRunner, range: NumberRange) -> Result<BatchSummary> {
    let mut summary = runner.run(range).await?;
    if summary.failed() > 0 {
        runner.retry_failed(&mut summary).await?;
    }
    Ok(summary)
}

async fn print_voices(provider: &dyn TextToSpeech) -> Result<()> {
    let voices = provider
        .list_voices()
        .await
        .with_context(|| format!("Failed to list {} voices", provider.name()))?;

    println!("Available {} voices:", provider.name());
    for voice in voices {
        match &voice.category {
            Some(category) => println!("  {}: {} ({category})", voice.id, voice.name),
            None => println!("  {}: {}", voice.id, voice.name),
        }
    }
    Ok(())
}

/// Returns false when the progress task panicked or was cancelled.
async fn wait_for_renderer(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Progress renderer stopped abnormally");
            false
        }
    }
}

/// Run `work` unless `interrupt` resolves first, in which case the run fails
/// and the process exits with status 1.
async fn until_interrupted<T>(
    work: impl Future<Output = Result<T>>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Result<T> {
    tokio::select! {
        result = work => result,
        _ = interrupt => {
            info!("Generation interrupted by user");
            bail!("Generation interrupted by user");
        }
    }
}

/// Archive the output directory (when `archive_path` is set) and build the
/// summary report. An archive failure is logged and the report is still
/// produced.
fn finish_run(
    range: NumberRange,
    layout: &OutputLayout,
    summary: &BatchSummary,
    archive_path: Option<&Path>,
) -> Vec<String> {
    if let Some(path) = archive_path {
        if let Err(e) = create_archive(layout, path) {
            error!("Error creating zip archive: {e:#}");
        }
    }

    SummaryReport::new(range, layout, summary).lines()
}

fn setup_tracing(log_file: &Path) -> Result<WorkerGuard> {
    use std::fs;
    use tracing_subscriber::fmt;

    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {log_file:?}"))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(filter)
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use numvox_core::batch::GenerationResult;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["numvox"]);
        assert_eq!(args.provider, ProviderKind::OpenAi);
        assert_eq!(args.start, 1);
        assert_eq!(args.end, 8000);
        assert_eq!(args.zip_name, PathBuf::from("number_audio_files.zip"));
        assert_eq!(args.log_file, PathBuf::from("tts_generation.log"));
        assert!(args.delay.is_none());
        assert!(!args.no_archive);
    }

    #[test]
    fn test_provider_flag() {
        let args = Args::parse_from(["numvox", "--provider", "elevenlabs", "--start", "5"]);
        assert_eq!(args.provider, ProviderKind::ElevenLabs);
        assert_eq!(args.start, 5);

        assert!(Args::try_parse_from(["numvox", "--provider", "espeak"]).is_err());
    }

    #[test]
    fn test_vibe_flags() {
        let args = Args::parse_from([
            "numvox",
            "--vibe-file",
            "vibes.json",
            "--vibe-key",
            "excited",
            "--delay",
            "0.5",
        ]);
        assert_eq!(args.vibe_file, Some(PathBuf::from("vibes.json")));
        assert_eq!(args.vibe_key.as_deref(), Some("excited"));
        assert_eq!(args.delay, Some(0.5));
    }

    #[test]
    fn test_report_survives_archive_failure() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path().join("empty"));
        let zip_path = temp.path().join("numbers.zip");
        let summary = BatchSummary {
            results: vec![
                GenerationResult::failed(1, "boom".to_string()),
                GenerationResult::failed(2, "boom".to_string()),
            ],
        };

        let lines = finish_run(
            NumberRange::new(1, 2).unwrap(),
            &layout,
            &summary,
            Some(zip_path.as_path()),
        );

        assert!(!zip_path.exists());
        assert!(lines.contains(&"GENERATION SUMMARY REPORT".to_string()));
        assert!(lines.contains(&"Failed: 2".to_string()));
        assert!(lines.contains(&"Success rate: 0.0%".to_string()));
    }

    #[test]
    fn test_report_without_archive() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        std::fs::write(layout.path_for(1), b"RIFF").unwrap();
        let summary = BatchSummary {
            results: vec![GenerationResult::generated(1)],
        };

        let lines = finish_run(NumberRange::new(1, 1).unwrap(), &layout, &summary, None);

        assert!(lines.contains(&"Success rate: 100.0%".to_string()));
        assert!(!temp.path().join(DEFAULT_ARCHIVE_NAME).exists());
    }

    #[tokio::test]
    async fn test_renderer_panic_is_reported() {
        let clean = tokio::spawn(async {});
        assert!(wait_for_renderer(clean).await);

        let panicked = tokio::spawn(async { panic!("renderer bug") });
        assert!(!wait_for_renderer(panicked).await);
    }

    #[tokio::test]
    async fn test_interrupt_fails_the_run() {
        let err = until_interrupted(
            std::future::pending::<Result<()>>(),
            std::future::ready(Ok(())),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Generation interrupted by user");
    }

    #[tokio::test]
    async fn test_finished_work_is_returned() {
        let value = until_interrupted(async { Ok(7) }, std::future::pending())
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
