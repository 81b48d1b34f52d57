use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use ffmpeg_next::util::log::Level as FfmpegLevel;
use framepersist::{
    AnalysisOptions, PersistenceError, ProgressCallback, ProgressInfo, ResdetProber, Tolerance,
    VideoComparisonOptions, VideoFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framepersist analyze capture.mp4 --tolerance 4 --csv-output capture.csv --progress\n  framepersist metadata capture.mp4 --json\n  framepersist compare-frames a.png b.png\n  framepersist count-unique-video-frames a.mp4 b.mp4 --min-difference 100\n  framepersist completions zsh > _framepersist";

#[derive(Debug, Parser)]
#[command(
    name = "framepersist",
    version,
    about = "Measure frame persistence, unique frames per second, and effective frame rate of a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze frame persistence in a single video.
    #[command(
        about = "Analyze frame persistence in a single video",
        visible_alias = "analyze-frame-persistence",
        after_help = "Examples:\n  framepersist analyze capture.mp4\n  framepersist analyze capture.mp4 --tolerance 2.5 --csv-output frames.csv --verbose\n  framepersist analyze capture.mp4 --resdet --json"
    )]
    Analyze {
        /// Input video path.
        video: PathBuf,
        /// Pixel difference tolerance (0-255, fractional part ignored).
        #[arg(long, default_value_t = 0.0)]
        tolerance: f64,
        /// Path to CSV file for per-frame output.
        #[arg(long)]
        csv_output: Option<PathBuf>,
        /// Measure each frame's native resolution with resdet (very slow).
        #[arg(long)]
        resdet: bool,
        /// resdet executable to run (implies --resdet).
        #[arg(long)]
        resdet_program: Option<PathBuf>,
        /// Log the unique-frame count of every second.
        #[arg(long)]
        verbose: bool,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decode a video and print its exact frame count.
    #[command(about = "Count the frames of a video")]
    CountFrames {
        /// Input video path.
        video: PathBuf,
    },

    /// Count differing samples between two images.
    #[command(
        about = "Compare two image files sample by sample",
        after_help = "Examples:\n  framepersist compare-frames frame1.png frame2.png\n  framepersist compare-frames frame1.png frame2.png --tolerance 9"
    )]
    CompareFrames {
        image1: PathBuf,
        image2: PathBuf,
        /// Squared-difference tolerance (0-255).
        #[arg(long, default_value_t = 0.0)]
        tolerance: f64,
    },

    /// Pair two videos frame by frame and count the pairs that differ.
    #[command(about = "Count frame pairs that differ between two videos")]
    CountUniqueVideoFrames {
        video1: PathBuf,
        video2: PathBuf,
        /// Minimum differing samples for a pair to count as unique.
        #[arg(long, default_value_t = 1)]
        min_difference: u64,
        /// Squared-difference tolerance (0-255).
        #[arg(long, default_value_t = 0.0)]
        tolerance: f64,
    },

    /// Print video stream metadata.
    #[command(about = "Print video metadata", visible_alias = "probe")]
    Metadata {
        /// Input video path.
        video: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" | "none" => Some(LevelFilter::Off),
        "warning" => Some(LevelFilter::Warn),
        other => LevelFilter::from_str(other).ok(),
    }
}

fn ffmpeg_level(level: LevelFilter) -> FfmpegLevel {
    match level {
        LevelFilter::Off => FfmpegLevel::Quiet,
        LevelFilter::Error => FfmpegLevel::Error,
        LevelFilter::Warn | LevelFilter::Info => FfmpegLevel::Warning,
        LevelFilter::Debug => FfmpegLevel::Info,
        LevelFilter::Trace => FfmpegLevel::Debug,
    }
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let level = parse_log_level(&global.log_level)
        .ok_or(format!("unsupported --log-level: {}", global.log_level))?;

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();
    ffmpeg_next::util::log::set_level(ffmpeg_level(level));

    Ok(())
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn warn(message: impl AsRef<str>) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.as_ref().yellow());
}

/// Drives an indicatif bar from library progress callbacks.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(frame_count_hint: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = if frame_count_hint > 0 {
            ProgressBar::new(frame_count_hint)
        } else {
            ProgressBar::no_length()
        };
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames ({eta})")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(expected) = info.expected {
            // Container frame counts are estimates and can undershoot.
            self.bar.set_length(expected.max(info.processed));
        }
        self.bar.set_position(info.processed);
    }
}

/// The frame count hint is only looked up when the bar is enabled.
fn progress_bar(
    enabled: bool,
    frame_count_hint: impl FnOnce() -> Result<u64, PersistenceError>,
) -> Result<Option<Arc<BarProgress>>, Box<dyn std::error::Error>> {
    if enabled {
        Ok(Some(Arc::new(BarProgress::new(frame_count_hint()?)?)))
    } else {
        Ok(None)
    }
}

fn video_frame_count(path: &Path) -> Result<u64, PersistenceError> {
    Ok(VideoFile::open(path)?.metadata().frame_count)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Analyze {
            video,
            tolerance,
            csv_output,
            resdet,
            resdet_program,
            verbose,
            json,
        } => {
            if let Some(path) = &csv_output {
                ensure_writable_path(path, cli.global.overwrite)?;
            }

            let mut options = AnalysisOptions::new()
                .with_tolerance(Tolerance::from_level(tolerance)?)
                .with_verbose(verbose);

            if resdet || resdet_program.is_some() {
                let mut prober = ResdetProber::new();
                if let Some(program) = &resdet_program {
                    prober = prober.with_program(program);
                }
                options = options.with_prober(Arc::new(prober));
            }

            let mut file = VideoFile::open(&video)?;
            let frame_count = file.metadata().frame_count;
            let progress = progress_bar(cli.global.progress, || Ok(frame_count))?;
            if let Some(progress) = &progress {
                options = options.with_progress(progress.clone());
            }

            let result = framepersist::analyze(&mut file.frames()?, &options);
            if let Some(progress) = &progress {
                progress.finish();
            }
            let analysis = result?;

            let summary = analysis.summary();
            if json {
                let payload = json!({
                    "video": video.display().to_string(),
                    "frame_rate": analysis.frame_rate(),
                    "frame_time_ms": analysis.frame_time_ms(),
                    "total_frames": summary.total_frames,
                    "duration_seconds": summary.duration.as_secs_f64(),
                    "unique_frames": summary.unique_frames,
                    "unique_per_second": summary.unique_per_second,
                    "average_unique_per_second": summary.average_unique_per_second,
                    "average_persistence_ms": summary.average_persistence_ms,
                    "persistence_events": analysis.events().iter().map(|event| json!({
                        "unique_frame_id": event.unique_frame_id,
                        "first_frame": event.first_frame,
                        "duplicate_count": event.duplicate_count,
                        "duration_ms": event.duration_ms,
                    })).collect::<Vec<_>>(),
                    "average_resolution": summary.average_resolution.map(|(width, height)| json!({
                        "width": width,
                        "height": height,
                    })),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print!("{summary}");
            }

            if let Some(path) = &csv_output {
                let outcome = framepersist::save_csv(&analysis.export_rows(), path)?;
                if outcome.is_complete() {
                    eprintln!("{} {}", "saved".green().bold(), path.display());
                } else {
                    warn(format!(
                        "{} of {} CSV rows could not be written to {}",
                        outcome.failed_rows.len(),
                        analysis.total_frames(),
                        path.display()
                    ));
                }
            }
        }
        Commands::CountFrames { video } => {
            let progress = progress_bar(cli.global.progress, || video_frame_count(&video))?;
            let result = framepersist::count_frames(
                &video,
                progress.clone().map(|bar| bar as Arc<dyn ProgressCallback>),
            );
            if let Some(progress) = &progress {
                progress.finish();
            }
            println!("Video total frames: {}", result?);
        }
        Commands::CompareFrames {
            image1,
            image2,
            tolerance,
        } => {
            let differing =
                framepersist::compare_image_files(&image1, &image2, Tolerance::from_level(tolerance)?)?;
            println!("Total differing samples: {differing}");
        }
        Commands::CountUniqueVideoFrames {
            video1,
            video2,
            min_difference,
            tolerance,
        } => {
            let progress = progress_bar(cli.global.progress, || video_frame_count(&video1))?;

            let mut options = VideoComparisonOptions::new()
                .with_min_differing_samples(min_difference)
                .with_tolerance(Tolerance::from_level(tolerance)?);
            if let Some(progress) = &progress {
                options = options.with_progress(progress.clone());
            }

            let result = framepersist::count_unique_video_frames(&video1, &video2, &options);
            if let Some(progress) = &progress {
                progress.finish();
            }
            let comparison = result?;

            if comparison.length_mismatch {
                warn(format!(
                    "videos have different lengths, compared the first {} frames",
                    comparison.compared_frames
                ));
            }
            println!(
                "{}/{} are unique!",
                comparison.unique_frames, comparison.compared_frames
            );
        }
        Commands::Metadata { video, json } => {
            let file = VideoFile::open(&video)?;
            let metadata = file.metadata();
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "codec": metadata.codec,
                    "width": metadata.width,
                    "height": metadata.height,
                    "frames_per_second": metadata.frames_per_second,
                    "frame_count": metadata.frame_count,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:.3}s", metadata.duration.as_secs_f64());
                println!(
                    "Video: {}x{} @ {:.3} fps, {} frames [{}]",
                    metadata.width,
                    metadata.height,
                    metadata.frames_per_second,
                    metadata.frame_count,
                    metadata.codec
                );
                if let Some(frame_time) = metadata.frame_time_ms() {
                    println!("Frame time: {frame_time:.2} ms");
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framepersist", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_log_level_aliases() {
        assert_eq!(parse_log_level("info"), Some(LevelFilter::Info));
        assert_eq!(parse_log_level("WARN"), Some(LevelFilter::Warn));
        assert_eq!(parse_log_level("warning"), Some(LevelFilter::Warn));
        assert_eq!(parse_log_level("quiet"), Some(LevelFilter::Off));
        assert_eq!(parse_log_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_log_level("loud"), None);
    }

    #[test]
    fn analyze_accepts_legacy_name_and_trailing_globals() {
        let cli = Cli::try_parse_from([
            "framepersist",
            "analyze-frame-persistence",
            "capture.mp4",
            "--tolerance",
            "2.7",
            "--csv-output",
            "out.csv",
            "--progress",
        ])
        .unwrap();

        assert!(cli.global.progress);
        match cli.command {
            Commands::Analyze {
                video,
                tolerance,
                csv_output,
                resdet,
                ..
            } => {
                assert_eq!(video, PathBuf::from("capture.mp4"));
                assert_eq!(tolerance, 2.7);
                assert_eq!(csv_output, Some(PathBuf::from("out.csv")));
                assert!(!resdet);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn count_unique_defaults_to_one_differing_sample() {
        let cli =
            Cli::try_parse_from(["framepersist", "count-unique-video-frames", "a.mp4", "b.mp4"]).unwrap();
        match cli.command {
            Commands::CountUniqueVideoFrames {
                min_difference,
                tolerance,
                ..
            } => {
                assert_eq!(min_difference, 1);
                assert_eq!(tolerance, 0.0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn frame_count_is_only_looked_up_for_enabled_bars() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp4");

        assert!(progress_bar(false, || video_frame_count(&missing)).unwrap().is_none());
        assert!(progress_bar(true, || video_frame_count(&missing)).is_err());
    }

    #[test]
    fn ensure_writable_path_respects_overwrite() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ensure_writable_path(file.path(), false).is_err());
        assert!(ensure_writable_path(file.path(), true).is_ok());
        assert!(ensure_writable_path(&file.path().with_extension("missing"), false).is_ok());
    }
}
