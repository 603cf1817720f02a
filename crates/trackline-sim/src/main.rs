//! trackline-sim: CLI frame simulator for the trackline engine.
//!
//! Plays the part of the animation clock and the renderer: advances the
//! drive parameter frame by frame, asks the engine for placements, and
//! prints them together with per-frame diagnostics. Useful for:
//!
//! - Comparing raw-parameter and arc-length motion on the same track
//! - Tuning the arc-length sample step against placement cost
//! - Checking how a custom control-point loop behaves at the seam
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin trackline-sim -- [OPTIONS]
//! RUST_LOG=debug cargo run --bin trackline-sim -- --mode raw --cars 4
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use trackline_engine::diagnostics::duration_ms;
use trackline_engine::{
    ControlPointSet, EngineConfig, Frame, FrameDiagnostics, FrameDriver, Point, SpeedMode,
    SplineEvaluator, TrackConfig, TrackGeometry,
};

/// Drive parameter increment per frame (the slider step of the
/// interactive editor).
const DEFAULT_SPEED: f64 = 0.05;

/// Frame simulator for closed Catmull-Rom tracks.
///
/// Moves a train of objects around the track for a number of frames and
/// prints each object's position and heading.
#[derive(Parser)]
#[command(name = "trackline-sim", version)]
struct Cli {
    /// Control points as `x,y;x,y;...` (defaults to the built-in loop).
    #[arg(long)]
    points: Option<String>,

    /// Speed mode.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_MODE)]
    mode: Mode,

    /// Number of objects (leader plus cars).
    #[arg(long, default_value_t = EngineConfig::DEFAULT_OBJECT_COUNT, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    cars: usize,

    /// Gap between objects in raw mode, in curve-parameter units.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_PARAMETER_SPACING)]
    parameter_spacing: f64,

    /// Gap between objects in arc-length mode, in length units.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_LENGTH_SPACING)]
    length_spacing: f64,

    /// Parameter step of the arc-length table.
    #[arg(long, default_value_t = EngineConfig::DEFAULT_SAMPLE_STEP)]
    sample_step: f64,

    /// Number of frames to simulate (defaults to one lap).
    #[arg(long)]
    frames: Option<usize>,

    /// Drive parameter increment per frame.
    #[arg(long, default_value_t = DEFAULT_SPEED)]
    speed: f64,

    /// Drive parameter of the first frame.
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Output frames as JSON lines instead of a human-readable listing.
    #[arg(long)]
    json: bool,

    /// Full engine config as a JSON string.
    ///
    /// When provided, all other engine parameter flags are ignored.
    /// The JSON must be a valid `EngineConfig` serialization; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Also emit rail and tie geometry for the first rendered frame.
    #[arg(long)]
    rails: bool,
}

/// Speed mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Drive parameter used directly as the curve parameter.
    Raw,
    /// Constant speed through the arc-length table.
    Arc,
}

/// Maps a [`SpeedMode`] to the local CLI [`Mode`] enum.
const fn mode_from_engine(mode: SpeedMode) -> Mode {
    match mode {
        SpeedMode::RawParameter => Mode::Raw,
        SpeedMode::ArcLength => Mode::Arc,
    }
}

/// The CLI default mode, derived from [`EngineConfig::DEFAULT_SPEED_MODE`]
/// so the two cannot silently diverge.
const CLI_DEFAULT_MODE: Mode = mode_from_engine(EngineConfig::DEFAULT_SPEED_MODE);

/// Build an [`EngineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EngineConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        EngineConfig {
            sample_step: cli.sample_step,
            speed_mode: match cli.mode {
                Mode::Raw => SpeedMode::RawParameter,
                Mode::Arc => SpeedMode::ArcLength,
            },
            object_count: cli.cars,
            parameter_spacing: cli.parameter_spacing,
            length_spacing: cli.length_spacing,
            ..EngineConfig::default()
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Parse `x,y;x,y;...` into a control-point set.
///
/// Blank entries (e.g. a trailing `;`) are skipped. The point count is
/// not checked here; the engine reports too-short loops per frame.
fn parse_points(text: &str) -> Result<ControlPointSet, String> {
    text.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| format!("expected `x,y`, got `{pair}`"))?;
            let x: f64 = x
                .trim()
                .parse()
                .map_err(|e| format!("bad x coordinate in `{pair}`: {e}"))?;
            let y: f64 = y
                .trim()
                .parse()
                .map_err(|e| format!("bad y coordinate in `{pair}`: {e}"))?;
            Ok(Point::new(x, y))
        })
        .collect::<Result<Vec<_>, String>>()
        .map(ControlPointSet::new)
}

/// Number of frames that covers one full lap at `speed`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn lap_frames(segments: usize, speed: f64) -> Result<usize, String> {
    if !(speed.is_finite() && speed > 0.0) {
        return Err(format!(
            "--speed must be positive to derive one lap, got {speed}; pass --frames instead"
        ));
    }
    Ok((segments as f64 / speed - 1e-9).ceil().max(1.0) as usize)
}

/// One frame as written in JSON mode.
#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: usize,
    drive: f64,
    #[serde(flatten)]
    result: &'a Frame,
}

/// Counters accumulated over the run.
#[derive(Default)]
struct RunSummary {
    rendered: usize,
    skipped: usize,
    placement_ms: Vec<f64>,
    build_ms: Vec<f64>,
}

impl RunSummary {
    fn record(&mut self, diagnostics: &FrameDiagnostics) {
        self.rendered += 1;
        self.placement_ms.push(duration_ms(diagnostics.placement));
        if diagnostics.rebuilt {
            self.build_ms.push(duration_ms(diagnostics.table_build));
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn report(&self, rebuilds: u64) -> String {
        let mean = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };
        let mut lines = Vec::new();
        lines.push(format!("Summary\n{}", "=".repeat(40)));
        lines.push(format!(
            "Frames rendered: {}  |  skipped: {}",
            self.rendered, self.skipped
        ));
        lines.push(format!("Table rebuilds: {rebuilds}"));
        lines.push(format!(
            "Mean table build: {:.3}ms",
            mean(&self.build_ms)
        ));
        lines.push(format!(
            "Mean placement: {:.3}ms",
            mean(&self.placement_ms)
        ));
        lines.join("\n")
    }
}

/// Print one rendered frame in the selected format.
fn emit_frame(index: usize, drive: f64, frame: &Frame, json: bool) -> Result<(), String> {
    if json {
        let record = FrameRecord {
            frame: index,
            drive,
            result: frame,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| format!("Error serializing frame {index}: {e}"))?;
        println!("{line}");
    } else {
        println!("{}", frame_listing(index, drive, frame));
    }
    Ok(())
}

/// Human-readable frame: one line per object, followed by the full
/// diagnostics report whenever the arc-length table was rebuilt.
fn frame_listing(index: usize, drive: f64, frame: &Frame) -> String {
    let mut lines = vec![format!("frame {index:>4}  drive {drive:.3}")];
    for (k, placement) in frame.placements.iter().enumerate() {
        lines.push(format!(
            "  object {k}: x={:>9.3} y={:>9.3} heading={:>8.2}°",
            placement.position.x,
            placement.position.y,
            placement.orientation.to_degrees(),
        ));
    }
    if frame.diagnostics.rebuilt {
        lines.push(frame.diagnostics.report());
    }
    lines.join("\n")
}

/// Print rails and ties for the current table.
fn emit_track(points: &ControlPointSet, driver: &FrameDriver, config: &EngineConfig, json: bool) {
    let Some(table) = driver.table() else {
        return;
    };
    let track = SplineEvaluator::new(points).and_then(|spline| {
        TrackGeometry::build(&spline, table, &TrackConfig::default(), config.tangent_epsilon)
    });
    match track {
        Ok(track) if json => match serde_json::to_string(&track) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Error serializing track geometry: {e}"),
        },
        Ok(track) => {
            println!(
                "track: {} segments, rails {} + {} points ({:.3} / {:.3} long), {} ties",
                track.segments.len(),
                track.left_rail.len(),
                track.right_rail.len(),
                track.left_rail.length(),
                track.right_rail.length(),
                track.ties.len(),
            );
        }
        Err(e) => log::warn!("no track geometry: {e}"),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let points = match cli.points.as_deref().map(parse_points) {
        None => ControlPointSet::default_track(),
        Some(Ok(points)) => points,
        Some(Err(msg)) => {
            eprintln!("Error parsing --points: {msg}");
            return ExitCode::FAILURE;
        }
    };

    let frames = match cli.frames.map_or_else(|| lap_frames(points.len(), cli.speed), Ok) {
        Ok(frames) => frames,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "simulating {frames} frames on {} control points ({:?}, {} objects)",
        points.len(),
        config.speed_mode,
        config.object_count,
    );
    eprintln!("Config: {config:#?}");
    eprintln!();

    let mut driver = FrameDriver::new();
    let mut summary = RunSummary::default();
    let mut track_emitted = false;

    for index in 0..frames {
        #[allow(clippy::cast_precision_loss)]
        let drive = (index as f64).mul_add(cli.speed, cli.start);

        // The driver logs the reason for every skipped frame.
        let Ok(frame) = driver.frame(&points, drive, &config) else {
            summary.skipped += 1;
            continue;
        };

        if let Err(msg) = emit_frame(index, drive, &frame, cli.json) {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
        summary.record(&frame.diagnostics);

        if cli.rails && !track_emitted {
            emit_track(&points, &driver, &config, cli.json);
            track_emitted = true;
        }
    }

    let report = summary.report(driver.rebuild_count());
    if cli.json {
        eprintln!("{report}");
    } else {
        println!();
        println!("{report}");
    }

    if summary.rendered == 0 {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
