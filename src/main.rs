//! Cube Turner
//!
//! Turns the layers of a 3x3x3 cube with drag gestures. A drag picks the
//! horizontal or vertical layer through a face anchor, the layer follows the
//! drag, and on release it snaps to the nearest quarter turn. Runs as an
//! interactive 3D viewer or headless from the command line.

mod visualization;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use glam::Vec2;

use cubeturn::config::{ConfigError, RotatorConfig};
use cubeturn::diagnostics::LogDiagnostics;
use cubeturn::grid::format_layout;
use cubeturn::scene::SceneError;
use cubeturn::Puzzle;

/// Turns the layers of a 3x3x3 cube with drag gestures.
#[derive(Parser)]
#[command(name = "cubeturn")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file overriding the default parameters.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the interactive 3D viewer.
    Play,
    /// Script a single gesture and print the layout before and after.
    Simulate(SimulateArgs),
    /// Print the effective parameters as TOML.
    Config,
}

#[derive(Args, Debug, Clone)]
struct SimulateArgs {
    /// Face anchor to drag, 0-8 from top-left to bottom-right.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(0..9))]
    anchor: u8,
    /// Horizontal drag delta per frame.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    dx: f32,
    /// Vertical drag delta per frame, positive up.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    dy: f32,
    /// Number of drag-update frames between press and release.
    #[arg(long, default_value_t = 90)]
    frames: usize,
    /// Length of one frame in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("error building the cube: {0}")]
    Scene(#[from] SceneError),
}

fn main() -> Result<(), CliError> {
    env_logger::builder().init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RotatorConfig::load(path)?,
        None => RotatorConfig::default(),
    };

    match cli.command.unwrap_or(Command::Play) {
        Command::Play => {
            let puzzle = Puzzle::new(&config, Box::new(LogDiagnostics))?;
            println!("Controls: 1-9 pick anchor, right drag turns, C cancels");
            visualization::play(puzzle, config.cube.piece_size);
        }
        Command::Simulate(args) => print!("{}", simulate(&config, &args)?),
        Command::Config => print!("{}", config.to_toml_string()),
    }
    Ok(())
}

/// Runs one scripted gesture and reports what happened.
fn simulate(config: &RotatorConfig, args: &SimulateArgs) -> Result<String, SceneError> {
    let mut puzzle = Puzzle::new(config, Box::new(LogDiagnostics))?;
    puzzle.active_anchor = args.anchor.into();
    let frame = Duration::from_millis(args.frame_ms);
    let delta = Vec2::new(args.dx, args.dy);

    let mut output = format!("Before:\n{}\n", format_layout(&puzzle.layout()?));

    let Some(orientation) = puzzle.drag_begin(delta) else {
        output.push_str("Drag was not classified; nothing turned.\n");
        return Ok(output);
    };
    for _ in 0..args.frames {
        puzzle.drag_update(delta);
    }
    if let Some(snap) = puzzle.drag_end(delta) {
        output.push_str(&format!(
            "{orientation:?} layer through anchor {}: released at {}°, snapping to {}° ({:+}° in {}ms)\n",
            args.anchor,
            snap.current,
            snap.target,
            snap.delta,
            snap.duration.as_millis(),
        ));
    }
    if !puzzle.settle(frame, 10_000) {
        output.push_str("Snap did not finish.\n");
    }

    output.push_str(&format!("\nAfter:\n{}", format_layout(&puzzle.layout()?)));
    Ok(output)
}
