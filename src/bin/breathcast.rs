use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use breathcast::{
    BreathingPattern, BreathingRenderer, EventLevel, EventSink, Exercise, PixelFormat, Recorder,
    RecorderConfig, RecordingRequest, SizePreset, Theme, UiContext, build_pixel_buffer,
};

#[derive(Parser, Debug)]
#[command(name = "breathcast", version, about = "Record breathing animations to MP4")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an MP4 video (requires `ffmpeg` on PATH).
    Record(RecordArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RecordArgs {
    /// Preset exercise.
    #[arg(long, value_enum, conflicts_with = "pattern")]
    exercise: Option<ExerciseArg>,

    /// Custom pattern as `inhale-hold-exhale` seconds, e.g. `4-7-8`.
    #[arg(long)]
    pattern: Option<String>,

    /// Color theme.
    #[arg(long, value_enum, default_value_t = ThemeArg::Ocean)]
    theme: ThemeArg,

    /// Output size.
    #[arg(long, value_enum, default_value_t = SizeArg::Square)]
    size: SizeArg,

    /// Length in seconds.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(5..=60))]
    duration: u32,

    /// Output directory (overrides the config file).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Recorder config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Pattern as `inhale-hold-exhale` seconds.
    #[arg(long, default_value = "4-7-8")]
    pattern: String,

    /// Color theme.
    #[arg(long, value_enum, default_value_t = ThemeArg::Ocean)]
    theme: ThemeArg,

    /// Output size.
    #[arg(long, value_enum, default_value_t = SizeArg::Square)]
    size: SizeArg,

    /// Animation time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExerciseArg {
    Relaxing,
    Coherent,
    Calming,
    Equal,
}

impl From<ExerciseArg> for Exercise {
    fn from(v: ExerciseArg) -> Self {
        match v {
            ExerciseArg::Relaxing => Exercise::Relaxing,
            ExerciseArg::Coherent => Exercise::Coherent,
            ExerciseArg::Calming => Exercise::Calming,
            ExerciseArg::Equal => Exercise::Equal,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeArg {
    Ocean,
    Sunset,
    Forest,
    Mono,
}

impl From<ThemeArg> for Theme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Ocean => Theme::Ocean,
            ThemeArg::Sunset => Theme::Sunset,
            ThemeArg::Forest => Theme::Forest,
            ThemeArg::Mono => Theme::Mono,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SizeArg {
    Square,
    Portrait,
    Landscape,
    Small,
}

impl From<SizeArg> for SizePreset {
    fn from(v: SizeArg) -> Self {
        match v {
            SizeArg::Square => SizePreset::Square,
            SizeArg::Portrait => SizePreset::Portrait,
            SizeArg::Landscape => SizePreset::Landscape,
            SizeArg::Small => SizePreset::Small,
        }
    }
}

/// Prints recorder events to stderr.
struct ConsoleEvents;

impl EventSink for ConsoleEvents {
    fn emit(&self, level: EventLevel, message: &str) {
        eprintln!("[{level}] {message}");
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Record(args) => cmd_record(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn spawn_recorder(cfg: RecorderConfig) -> anyhow::Result<Recorder> {
    let ui = UiContext::spawn(BreathingRenderer::new).context("start ui context")?;
    Ok(Recorder::new(cfg, ui)?)
}

fn cmd_record(args: RecordArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.config {
        Some(path) => RecorderConfig::load(path)?,
        None => RecorderConfig::default(),
    };
    if let Some(dir) = args.out_dir {
        cfg.output_dir = dir;
    }

    let theme = Theme::from(args.theme);
    let size = SizePreset::from(args.size);
    let duration_secs = f64::from(args.duration);
    let request = match args.pattern {
        Some(source) => {
            let pattern = BreathingPattern::parse(&source)
                .with_context(|| format!("invalid --pattern '{source}'"))?;
            RecordingRequest {
                label: format!("Custom {pattern}"),
                pattern_source: source,
                theme,
                duration_secs,
                canvas: size.canvas(),
            }
        }
        None => RecordingRequest::for_exercise(
            args.exercise.map(Exercise::from).unwrap_or(Exercise::Relaxing),
            theme,
            size,
            duration_secs,
        ),
    };

    let recorder = spawn_recorder(cfg)?;
    let handle = recorder.record(request, Arc::new(ConsoleEvents), |_, _| {})?;
    let outcome = handle.wait();
    match outcome.output_path {
        Some(path) if outcome.success => {
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        _ => anyhow::bail!(
            "recording failed ({} of {} frames encoded)",
            outcome.stats.frames_appended,
            outcome.stats.frames_total
        ),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let theme = Theme::from(args.theme);
    let canvas = SizePreset::from(args.size).canvas();
    let request = RecordingRequest {
        pattern_source: args.pattern,
        theme,
        label: "still".to_string(),
        duration_secs: 1.0,
        canvas,
    };

    let recorder = spawn_recorder(RecorderConfig::default())?;
    let frame = recorder.render_still(&request, args.time)?;
    let buffer = build_pixel_buffer(
        &frame,
        canvas,
        PixelFormat::Rgba8,
        theme.palette().background,
    )?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        buffer.data(),
        canvas.width,
        canvas.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
