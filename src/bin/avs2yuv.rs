use std::{
    ffi::OsString,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use avs2yuv::{
    Avs2YuvError, ClipMetadata, ConvertOptions, FfmpegEngine, FfmpegLogLevel, FrameSource,
    OutputTarget, ProgressCallback, ProgressInfo, pipeline, range, source,
};
use clap::{Parser, error::ErrorKind};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde_json::json;

const USAGE: &str = "Usage: avs2yuv [options] in.avs out.yuv\n\
-v\tprint the frame number after processing each frame\n\
-seek\tseek to the given frame number\n\
-frames\tstop after processing this many frames\n\
The outfile may be \"-\", meaning stdout.\n\
Output format is yuv4mpeg, as used by MPlayer and mjpegtools";

const CLI_AFTER_HELP: &str = "Examples:
  avs2yuv in.avs out.y4m
  avs2yuv -seek 100 -frames 50 in.avs - | x264 --demuxer y4m -o out.264 -
  avs2yuv -v in.avs
  avs2yuv --info --json in.avs";

#[derive(Debug, Parser)]
#[command(
    name = "avs2yuv",
    version,
    about = "Render a frame-server script to a YUV4MPEG2 stream",
    disable_help_flag = true,
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Print the frame number after processing each frame.
    #[arg(short = 'v')]
    verbose: bool,

    /// Print usage and exit.
    #[arg(short = 'h', long = "help")]
    help: bool,

    /// Seek to the given frame number (also accepted as `-seek`).
    #[arg(long, value_name = "N", default_value_t = 0, allow_negative_numbers = true)]
    seek: i64,

    /// Stop after processing this many frames (also accepted as `-frames`).
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    frames: Option<i64>,

    /// Show a progress bar on stderr.
    #[arg(long)]
    progress: bool,

    /// Print clip information and exit without converting.
    #[arg(long)]
    info: bool,

    /// With --info, print machine-readable JSON.
    #[arg(long, requires = "info")]
    json: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Input script.
    input: Option<PathBuf>,

    /// Output file, or `-` for stdout.
    output: Option<String>,
}

/// Rewrite the single-dash long options `-seek` and `-frames` for clap.
fn normalize_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-seek") => OsString::from("--seek"),
            Some("-frames") => OsString::from("--frames"),
            _ => arg,
        })
        .collect()
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "panic" => Some(FfmpegLogLevel::Panic),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "verbose" => Some(FfmpegLogLevel::Verbose),
        "debug" => Some(FfmpegLogLevel::Debug),
        "trace" => Some(FfmpegLogLevel::Trace),
        _ => None,
    }
}

fn print_usage() {
    eprintln!("avs2yuv {}\n{USAGE}", env!("CARGO_PKG_VERSION"));
}

/// Per-frame reporting on stderr: frame numbers, a progress bar, or both.
struct CliProgress {
    bar: Option<ProgressBar>,
    print_frame_numbers: bool,
}

impl ProgressCallback for CliProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        match &self.bar {
            Some(bar) => {
                if self.print_frame_numbers {
                    bar.println(info.frame_number.to_string());
                }
                bar.set_position(info.current);
                bar.set_message(format!("frame {}", info.frame_number));
            }
            None => eprintln!("{}", info.frame_number),
        }
    }
}

/// A hidden bar; it starts drawing once its length is known.
fn new_progress_bar() -> ProgressBar {
    let bar = ProgressBar::hidden();
    let style = ProgressStyle::with_template(
        "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("##-"));
    bar
}

fn print_info(input: &Path, metadata: &ClipMetadata, as_json: bool) {
    if as_json {
        let payload = json!({
            "input": input.display().to_string(),
            "width": metadata.width,
            "height": metadata.height,
            "fps": metadata.frame_rate.as_f64(),
            "fps_numerator": metadata.frame_rate.numerator,
            "fps_denominator": metadata.frame_rate.denominator,
            "frame_count": metadata.frame_count,
            "pixel_format": metadata.pixel_format.to_string(),
            "frame_size": metadata.frame_size(),
        });
        println!("{payload:#}");
    } else {
        println!("{}: {metadata}", input.display());
    }
}

/// A command line that passed every check made before the engine starts.
struct Invocation {
    input: PathBuf,
    output: Option<OutputTarget>,
    options: ConvertOptions,
    progress_bar: Option<ProgressBar>,
    log_level: Option<FfmpegLogLevel>,
}

fn validate_invocation(cli: &Cli) -> Result<Invocation, Avs2YuvError> {
    if cli.help {
        return Err(Avs2YuvError::Usage(String::new()));
    }

    let seek = range::validate_seek(cli.seek)?;
    let input = cli
        .input
        .clone()
        .ok_or_else(|| Avs2YuvError::Usage("missing input script".to_string()))?;
    let log_level = cli
        .log_level
        .as_deref()
        .map(|level| {
            parse_log_level(level)
                .ok_or_else(|| Avs2YuvError::Usage(format!("unsupported --log-level: {level}")))
        })
        .transpose()?;

    let mut options = ConvertOptions::new().with_seek(seek);
    if let Some(frames) = cli.frames {
        options = options.with_frames(frames);
    }
    let progress_bar = cli.progress.then(new_progress_bar);
    if cli.verbose || progress_bar.is_some() {
        options = options.with_progress(Arc::new(CliProgress {
            bar: progress_bar.clone(),
            print_frame_numbers: cli.verbose,
        }));
    }

    let output = cli.output.as_deref().map(OutputTarget::from_arg);
    if output.is_none() && !options.reports_progress() && !cli.info {
        return Err(Avs2YuvError::Usage(
            "nothing to do: give an output file or -v".to_string(),
        ));
    }

    Ok(Invocation {
        input,
        output,
        options,
        progress_bar,
        log_level,
    })
}

fn run(cli: Cli) -> Result<(), Avs2YuvError> {
    let invocation = validate_invocation(&cli)?;
    let input = &invocation.input;

    if !source::looks_like_avisynth_script(input) {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("infile ({}) doesn't look like an avisynth script", input.display()).yellow()
        );
    }

    let mut engine = match invocation.log_level {
        Some(level) => FfmpegEngine::with_log_level(level)?,
        None => FfmpegEngine::new()?,
    };

    let clip = source::open_clip(&mut engine, input)?;
    eprintln!("{}: {}", input.display(), clip.metadata());
    if !clip.metadata().pixel_format.is_planar_yuv420() {
        eprintln!("converting {} -> YV12", clip.metadata().pixel_format);
    }
    let mut clip = source::normalize(&mut engine, clip)?;
    source::validate_progressive(clip.metadata())?;

    if cli.info {
        print_info(input, clip.metadata(), cli.json);
        return Ok(());
    }

    if let Some(bar) = &invocation.progress_bar {
        bar.set_length(invocation.options.range(clip.metadata().frame_count).len());
        bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    let mut output = invocation.output.as_ref().map(OutputTarget::open).transpose()?;

    let summary = pipeline::convert_clip(
        &mut clip,
        output.as_mut().map(|output| output as &mut dyn Write),
        &invocation.options,
    )?;

    if let Some(bar) = &invocation.progress_bar {
        bar.finish_with_message("done");
    }

    if cli.verbose {
        let destination = match &invocation.output {
            Some(target) => target
                .path()
                .map_or_else(|| "stdout".to_string(), |path| path.display().to_string()),
            None => "nowhere (dry run)".to_string(),
        };
        eprintln!(
            "{} {}",
            "success:".green().bold(),
            format!(
                "{} frame(s), {} bytes -> {destination}",
                summary.frames_processed, summary.bytes_written
            )
            .green()
        );
    }

    Ok(())
}

fn main() {
    let cli = match Cli::try_parse_from(normalize_legacy_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(error) if error.kind() == ErrorKind::DisplayVersion => error.exit(),
        Err(error) => {
            let _ = error.print();
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(error) = run(cli) {
        match &error {
            Avs2YuvError::Usage(message) => {
                if !message.is_empty() {
                    eprintln!("{message}");
                }
                print_usage();
            }
            other => eprintln!("{} {other}", "error:".red().bold()),
        }
        std::process::exit(error.exit_code());
    }
}
