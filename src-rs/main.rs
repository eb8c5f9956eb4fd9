mod color;
mod config;
mod fsutil;
mod histogram;
mod layout;
mod pipeline;
mod render;
mod scene;
mod shell;
mod source;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use color::Rgb;
use config::{FrameConfig, Gradient, RendererKind, Settings};
use fsutil::{file_name, snapshot_path};
use pipeline::{RunOptions, RunReport};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "snapframe",
    version,
    about = "Capture a screen region and frame it on a color-matched border over a gradient",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    // Without a subcommand, `snap` runs with these arguments.
    #[command(flatten)]
    snap: SnapArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print supported commands in JSON
    Commands,
    /// Capture a region, frame it in place and reveal it (default)
    Snap(SnapArgs),
    /// Frame an existing image file
    Frame(FrameArgs),
    /// Print the frame geometry for a screenshot size as JSON
    Layout(LayoutArgs),
}

#[derive(Args, Debug, Clone)]
struct FramingArgs {
    /// Canvas aspect ratio as height / width
    #[arg(long, default_value_t = 2.0 / 3.0)]
    target_aspect: f64,
    /// Outer padding per side, as a fraction of the canvas
    #[arg(long, default_value_t = 0.1)]
    outer_pad: f64,
    /// Border padding per side around the screenshot, as a fraction of the canvas
    #[arg(long, default_value_t = 0.02)]
    screenshot_pad: f64,
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    #[command(flatten)]
    framing: FramingArgs,
    /// Gradient start color (bottom-left at 45°)
    #[arg(long, default_value = "#0069a3")]
    gradient_from: Rgb,
    /// Gradient end color (top-right at 45°)
    #[arg(long, default_value = "#00bb8a")]
    gradient_to: Rgb,
    /// Gradient direction in CSS degrees
    #[arg(long, default_value_t = 45.0)]
    gradient_angle: f64,
    /// Rendering backend
    #[arg(long, value_enum, default_value_t = RendererKind::Raster)]
    renderer: RendererKind,
    /// Browser executable for --renderer browser
    #[arg(long)]
    browser: Option<String>,
    /// Seconds before rendering is abandoned
    #[arg(long, default_value_t = 30)]
    render_timeout: u64,
    /// Measure color and layout one after the other instead of in parallel
    #[arg(long, action = ArgAction::SetTrue)]
    sequential: bool,
    /// Also write the composed scene as JSON
    #[arg(long)]
    emit_scene: Option<PathBuf>,
    /// Print the run report JSON to stdout
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct SnapArgs {
    /// Output PNG path (default: <save dir>/snap-<epoch ms>.png)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Do not open the file browser at the result
    #[arg(long, action = ArgAction::SetTrue)]
    no_reveal: bool,
    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Input image path
    input: PathBuf,
    /// Output PNG path (default: overwrite input)
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    /// Screenshot width in pixels
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,
    /// Screenshot height in pixels
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,
    #[command(flatten)]
    framing: FramingArgs,
}

impl FramingArgs {
    fn frame_config(&self, gradient: Gradient) -> Result<FrameConfig> {
        let config = FrameConfig {
            target_aspect_ratio: self.target_aspect,
            outer_pad_percent: self.outer_pad,
            screenshot_pad_percent: self.screenshot_pad,
            gradient,
        };
        config.validate()?;
        Ok(config)
    }
}

impl RenderArgs {
    fn settings(&self, reveal: bool) -> Result<Settings> {
        let gradient = Gradient {
            angle_deg: self.gradient_angle,
            from: self.gradient_from,
            to: self.gradient_to,
        };
        Ok(Settings {
            frame: self.framing.frame_config(gradient)?,
            renderer: self.renderer,
            browser: self.browser.clone(),
            render_timeout: Duration::from_secs(self.render_timeout.max(1)),
            parallel: !self.sequential,
            reveal,
        })
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            emit_scene: self.emit_scene.clone(),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => command_snap(cli.snap),
        Some(Commands::Commands) => print_commands(),
        Some(Commands::Snap(args)) => command_snap(args),
        Some(Commands::Frame(args)) => command_frame(args),
        Some(Commands::Layout(args)) => command_layout(args),
    }
}

fn print_commands() -> Result<()> {
    let rows = vec![
        json!({
            "name": "snap",
            "description": "Capture a screen region, frame it in place and reveal it.",
        }),
        json!({
            "name": "frame",
            "description": "Frame an existing image on a color-matched border over a gradient.",
        }),
        json!({
            "name": "layout",
            "description": "Print the frame geometry for a screenshot size.",
        }),
    ];

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "commands": rows }))?
    );
    Ok(())
}

fn command_snap(args: SnapArgs) -> Result<()> {
    let settings = args.render.settings(!args.no_reveal)?;
    let renderer = render::renderer_for(&settings)?;

    let out = match args.out {
        Some(path) => path,
        None => snapshot_path(&config::save_dir()),
    };

    let report = pipeline::snap(
        &out,
        &settings,
        &shell::SystemShell,
        renderer.as_ref(),
        &args.render.run_options(),
    )?;
    print_report(&report, args.render.json)
}

fn command_frame(args: FrameArgs) -> Result<()> {
    let settings = args.render.settings(false)?;
    let renderer = render::renderer_for(&settings)?;
    let out = args.out.clone().unwrap_or_else(|| args.input.clone());

    let report = pipeline::frame_file(
        &args.input,
        &out,
        &settings,
        renderer.as_ref(),
        &args.render.run_options(),
    )?;
    print_report(&report, args.render.json)
}

fn command_layout(args: LayoutArgs) -> Result<()> {
    let frame = args.framing.frame_config(Gradient::default())?;
    let geometry = layout::compute_layout(
        args.width,
        args.height,
        frame.target_aspect_ratio,
        frame.outer_pad_percent,
        frame.screenshot_pad_percent,
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&geometry).context("failed to encode geometry")?
    );
    Ok(())
}

fn print_report(report: &RunReport, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!("Saved to {}", file_name(&report.image_path));
    }
    Ok(())
}
