//! LED Ring Layout CLI
//!
//! Evaluates one ring layout or searches for the most uniform one.
//!
//! Usage:
//!   led-layout manual --height 10 --radius 10 --leds 4 --tilt 20 --output manual.json
//!   led-layout optimize --seed 7 --output optimized.json
//!   led-layout --config session.json optimize --relaxed-count

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use layout_optimizer::report::{write_report, ManualReport, OptimizationReport};
use layout_optimizer::{
    load_session_config, optimize_layout, CountStrategy, SessionConfig, StartRange,
};
use led_photometry::{FieldSummary, IrradianceModel};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "led-layout",
    about = "Illuminance and uniformity of ring-mounted LED layouts"
)]
struct Cli {
    /// Session config JSON; explicit flags override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute I0 and the illuminance field for one layout
    Manual(ManualArgs),
    /// Search the bounds for the most uniform layout
    Optimize(OptimizeArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Typical LED power in mW
    #[arg(long)]
    power_mw: Option<f64>,

    /// LED half-power semi-angle in degrees
    #[arg(long)]
    theta_led: Option<f64>,

    /// Lens half-power semi-angle in degrees
    #[arg(long)]
    theta_lens: Option<f64>,

    /// Luminous efficacy in lm/W
    #[arg(long)]
    efficacy: Option<f64>,
}

#[derive(Args, Debug)]
struct ReceiverArgs {
    /// Receiver width along X in cm
    #[arg(long)]
    width: Option<f64>,

    /// Receiver length along Y in cm
    #[arg(long)]
    length: Option<f64>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Write a JSON report here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include the full X/Y/illuminance grid in the report
    #[arg(long)]
    include_grid: bool,
}

#[derive(Args, Debug)]
struct ManualArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    receiver: ReceiverArgs,

    /// Ring height above the receiver in cm
    #[arg(long)]
    height: Option<f64>,

    /// Ring radius in cm
    #[arg(long)]
    radius: Option<f64>,

    /// Tilt toward the ring center in degrees
    #[arg(long)]
    tilt: Option<f64>,

    /// Number of LEDs on the ring
    #[arg(long)]
    leds: Option<usize>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    receiver: ReceiverArgs,

    /// Seed for the initial guess
    #[arg(long)]
    seed: Option<u64>,

    /// Draw the initial guess from the wide exploration range
    #[arg(long)]
    wide_start: bool,

    /// Treat the LED count as a continuous dimension instead of sweeping it
    #[arg(long)]
    relaxed_count: bool,

    /// Maximum descent iterations per local search
    #[arg(long)]
    max_iterations: Option<usize>,

    #[command(flatten)]
    output: OutputArgs,
}

fn override_with<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl SourceArgs {
    fn apply(&self, session: &mut SessionConfig) {
        let source = &mut session.source;
        override_with(&mut source.power_mw, self.power_mw);
        override_with(&mut source.theta_led_deg, self.theta_led);
        override_with(&mut source.theta_lens_deg, self.theta_lens);
        override_with(&mut source.efficacy_lm_per_w, self.efficacy);
    }
}

impl ReceiverArgs {
    fn apply(&self, session: &mut SessionConfig) {
        override_with(&mut session.receiver.width_cm, self.width);
        override_with(&mut session.receiver.length_cm, self.length);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "layout_optimizer=debug,led_photometry=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn log_summary(summary: &FieldSummary) {
    info!("Grid: {} x {} samples", summary.rows, summary.cols);
    info!(
        "Illuminance min/max/mean: {:.4} / {:.4} / {:.4}",
        summary.min, summary.max, summary.mean
    );
    match summary.uniformity {
        Some(u) => info!("Uniformity (min/max): {:.4}", u),
        None => info!("Uniformity: undefined (field maximum is zero)"),
    }
}

fn run_manual(mut session: SessionConfig, args: &ManualArgs) -> Result<()> {
    args.source.apply(&mut session);
    args.receiver.apply(&mut session);
    override_with(&mut session.layout.height_cm, args.height);
    override_with(&mut session.layout.radius_cm, args.radius);
    override_with(&mut session.layout.tilt_deg, args.tilt);
    override_with(&mut session.layout.num_leds, args.leds);
    session.validate()?;

    let breakdown = session.source.breakdown()?;
    let model = IrradianceModel::new(breakdown.center_intensity_cd, session.source.theta_lens_deg)?
        .with_zero_radius_policy(session.optimizer.zero_radius);
    let layout = session.layout;

    info!("Center intensity I0: {:.4} cd", breakdown.center_intensity_cd);
    info!("Lambertian order m: {:.4}", model.lambertian_order());
    info!(
        "Layout: h={:.2} cm, R1={:.2} cm, n={}, beta={:.2}°",
        layout.height_cm, layout.radius_cm, layout.num_leds, layout.tilt_deg
    );

    let field = model.field(&layout, &session.receiver)?;
    log_summary(&field.summary());

    if let Some(path) = &args.output.output {
        let report = ManualReport::new(
            session.source,
            breakdown,
            model.lambertian_order(),
            session.receiver,
            layout,
            &field,
            args.output.include_grid,
        );
        write_report(path, &report)?;
    }
    Ok(())
}

fn run_optimize(mut session: SessionConfig, args: &OptimizeArgs) -> Result<()> {
    args.source.apply(&mut session);
    args.receiver.apply(&mut session);
    if let Some(seed) = args.seed {
        session.optimizer.seed = Some(seed);
    }
    if args.wide_start {
        session.optimizer.start_range = StartRange::Wide;
    }
    if args.relaxed_count {
        session.optimizer.count_strategy = CountStrategy::Relaxed;
    }
    override_with(&mut session.optimizer.max_iterations, args.max_iterations);
    session.validate()?;

    let i0 = session.source.center_intensity()?;
    info!("Center intensity I0: {:.4} cd", i0);
    info!("Bounds: {:?}", session.bounds.pairs());

    let result = optimize_layout(
        i0,
        session.source.theta_lens_deg,
        &session.receiver,
        &session.bounds,
        &session.optimizer,
    )?;

    info!("{}", "=".repeat(60));
    info!("OPTIMIZED LAYOUT");
    info!("{}", "=".repeat(60));
    info!("Optimized Height (h): {:.4} cm", result.layout.height_cm);
    info!("Optimized Beta: {:.4}°", result.layout.tilt_deg);
    info!("Optimized Number of LEDs: {}", result.layout.num_leds);
    info!("Optimized Radius (R1): {:.4} cm", result.layout.radius_cm);
    if let Some(initial) = result.initial_uniformity {
        info!("Uniformity: {:.4} (start {:.4})", result.uniformity, initial);
    }
    if !result.converged {
        info!("Iteration limit reached before every local search converged");
    }
    log_summary(&result.field.summary());

    if let Some(path) = &args.output.output {
        let report = OptimizationReport::new(
            session.source,
            i0,
            session.receiver,
            session.bounds,
            session.optimizer.clone(),
            &result,
            args.output.include_grid,
        );
        write_report(path, &report)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("{}", "=".repeat(60));
    info!("LED Ring Illuminance & Uniformity");
    info!("{}", "=".repeat(60));

    let session = match &cli.config {
        Some(path) => load_session_config(path)?,
        None => SessionConfig::default(),
    };

    match &cli.command {
        Command::Manual(args) => run_manual(session, args),
        Command::Optimize(args) => run_optimize(session, args),
    }
}
