// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use irqlab_config::{load_scenario, InterruptScenario, SensorScenario};
use irqlab_core::OutputSink;
use irqlab_core::board::{VirtualLed, WallClock};
use irqlab_core::controller::IrqController;
use irqlab_core::mainloop::MainLoop;
use irqlab_core::metrics::LoopMetrics;
use irqlab_core::sensor::{SensorError, SensorLoop, SyntheticSensor, TextPanel};
use irqlab_core::signals::{CompletionSignal, DigitalLevel};

const EXIT_OK: u8 = 0;
const EXIT_RUNTIME_ERROR: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "IrqLab interrupt injection sandbox",
    long_about = None
)]
struct Cli {
    /// Enable debug-level execution tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Button-to-software-interrupt demo: poll a scripted button, inject the
    /// interrupt line, service it and observe the completion flag.
    Interrupt(InterruptArgs),

    /// Environment sensor demo: poll a synthetic sensor and paint readings
    /// to a text panel.
    Sensor(SensorArgs),
}

#[derive(Parser, Debug)]
struct InterruptArgs {
    /// Path to a scenario manifest (YAML)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Override the number of loop iterations
    #[arg(long)]
    iterations: Option<u64>,

    /// Override the per-iteration delay in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Override the interrupt line to arm
    #[arg(long)]
    line: Option<u32>,

    /// Iteration at which the button reads as pressed (repeatable)
    #[arg(long = "press")]
    presses: Vec<u64>,

    /// Write the loop report (JSON)
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SensorArgs {
    /// Path to a scenario manifest (YAML)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Override the number of samples to take
    #[arg(long)]
    samples: Option<u64>,

    /// Override the sampling period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Write the sensor report (JSON)
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let result = match cli.command {
        Commands::Interrupt(args) => run_interrupt(args),
        Commands::Sensor(args) => run_sensor(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn interrupt_scenario(args: &InterruptArgs) -> Result<InterruptScenario> {
    let mut scenario = match &args.scenario {
        Some(path) => load_scenario(path)?.interrupt.unwrap_or_default(),
        None => InterruptScenario::default(),
    };
    if let Some(iterations) = args.iterations {
        scenario.iterations = iterations;
    }
    if let Some(tick_ms) = args.tick_ms {
        scenario.tick_ms = tick_ms;
    }
    if let Some(line) = args.line {
        scenario.line = line;
    }
    if !args.presses.is_empty() {
        scenario.presses = args.presses.clone();
    }
    if scenario.presses.is_empty() {
        // Nobody scripted the button, press it once mid-run so the demo
        // actually fires.
        scenario.presses = vec![scenario.iterations / 2];
        info!(
            iteration = scenario.presses[0],
            "no presses configured, scripting one press"
        );
    }
    Ok(scenario)
}

fn run_interrupt(args: InterruptArgs) -> Result<()> {
    let scenario = interrupt_scenario(&args)?;
    info!(
        line = scenario.line,
        iterations = scenario.iterations,
        tick_ms = scenario.tick_ms,
        "starting interrupt demo"
    );

    let controller = Arc::new(IrqController::new());
    let done = Arc::new(CompletionSignal::new());
    let green = Arc::new(VirtualLed::new("green"));
    let red = Arc::new(VirtualLed::new("red"));

    // The service routine: drive the green LED and report completion back to
    // the polling loop, exactly what the original ISR did.
    let isr_led = green.clone();
    let isr_done = done.clone();
    controller.register(
        scenario.line,
        Arc::new(move || {
            isr_led.write(DigitalLevel::High);
            isr_done.mark_processed();
            info!("interrupt serviced");
        }),
    )?;
    controller.enable(scenario.line)?;

    let metrics = Arc::new(LoopMetrics::new());
    let mut main_loop = MainLoop::from_scenario(&scenario, controller.clone(), done)?
        .with_heartbeat(red)
        .with_observer(metrics.clone());

    let report = main_loop.run(Some(scenario.iterations));

    info!(
        iterations = report.iterations,
        dispatched = report.injections_dispatched,
        ignored = report.injections_ignored,
        completions = report.completions_observed,
        green_led_lit = green.is_lit(),
        "interrupt demo finished"
    );
    tracing::debug!(snapshot = %controller.snapshot(), "controller state");

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }
    Ok(())
}

fn sensor_scenario(args: &SensorArgs) -> Result<SensorScenario> {
    let mut scenario = match &args.scenario {
        Some(path) => load_scenario(path)?.sensor.unwrap_or_default(),
        None => SensorScenario::default(),
    };
    if let Some(samples) = args.samples {
        scenario.samples = samples;
    }
    if let Some(period_ms) = args.period_ms {
        scenario.period_ms = period_ms;
    }
    Ok(scenario)
}

fn run_sensor(args: SensorArgs) -> Result<()> {
    let scenario = sensor_scenario(&args)?;
    info!(
        samples = scenario.samples,
        period_ms = scenario.period_ms,
        "starting sensor demo"
    );

    let sensor = SyntheticSensor::new();
    for &step in &scenario.transfer_faults {
        sensor.fail_at(step, SensorError::TransferError);
    }
    for &step in &scenario.crc_faults {
        sensor.fail_at(step, SensorError::CrcError);
    }

    let panel = Arc::new(TextPanel::new());
    let mut sensor_loop = SensorLoop::new(
        sensor,
        panel.clone(),
        WallClock,
        Duration::from_millis(scenario.period_ms),
    );

    let report = sensor_loop.run(Some(scenario.samples));

    info!(
        samples = report.samples,
        frames = report.frames_painted,
        transfer_errors = report.transfer_errors,
        crc_errors = report.crc_errors,
        "sensor demo finished"
    );

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }
    Ok(())
}
