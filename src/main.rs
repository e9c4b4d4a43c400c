//! tickflow - CLI
//!
//! Drives a scripted demo scene through a simulated frame loop.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use tickflow::util::config::{load_config, DemoConfig};
use tickflow::util::logger::{self, LogLevel};
use tickflow::{
    start_action_over_time, start_delayed, start_instruction, start_named, ActionOverTime, HostHandle,
    Script, TaskHandle, TickSource, WaitFrames, NAME, VERSION,
};

/// Cooperative, frame-driven task scheduling for simulation loops
#[derive(Parser, Debug)]
#[command(name = "tickflow")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the demo scene
    Demo {
        /// RON config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Number of frames to simulate
        #[arg(long)]
        frames: Option<u64>,

        /// Seconds per frame
        #[arg(long)]
        dt: Option<f32>,

        /// Maximum random deviation added to each frame's dt
        #[arg(long)]
        jitter: Option<f32>,

        /// Seed for the jitter generator
        #[arg(long)]
        seed: Option<u64>,

        /// Keep dispatching other tasks when one fails
        #[arg(long)]
        isolate: bool,

        /// Start a task that fails two seconds in
        #[arg(long)]
        inject_failure: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default demo config as RON
    Config,

    /// Print version information
    Version,
}

#[derive(Debug, Serialize)]
struct TaskSummary {
    name: String,
    state: String,
}

#[derive(Debug, Serialize)]
struct DemoSummary {
    frames: u64,
    simulated_seconds: f32,
    failures: usize,
    remaining_subscribers: usize,
    tasks: Vec<TaskSummary>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_with_level(LogLevel::from_verbosity(args.verbose));

    match args.command {
        Commands::Demo {
            config,
            frames,
            dt,
            jitter,
            seed,
            isolate,
            inject_failure,
            json,
        } => {
            let mut cfg = match config {
                Some(path) => load_config(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => DemoConfig::default(),
            };
            // CLI arguments take precedence over the config file.
            if let Some(frames) = frames {
                cfg.frames = frames;
            }
            if let Some(dt) = dt {
                cfg.dt = dt;
            }
            if let Some(jitter) = jitter {
                cfg.jitter = jitter;
            }
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            cfg.isolate |= isolate;
            cfg.validate()?;

            let summary = run_demo(&cfg, inject_failure)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                info!(
                    "{} frames, {:.2}s simulated, {} failures",
                    summary.frames, summary.simulated_seconds, summary.failures
                );
                for task in &summary.tasks {
                    info!("{:<10} {}", task.name, task.state);
                }
            }
        }
        Commands::Config => {
            println!("{}", DemoConfig::default().to_ron()?);
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

/// Start the scene's tasks. Returns `(label, handle)` pairs for reporting.
fn build_scene(
    host: &HostHandle,
    inject_failure: bool,
) -> Result<Vec<(&'static str, TaskHandle)>> {
    let mut tasks = Vec::new();

    let door = Script::new()
        .wait_seconds(1.0)
        .then(|| info!("door: unlocked"))
        .wait(ActionOverTime::new(2.0).on_progress(|t| tracing::trace!("door: angle {:.0}", t * 90.0)))
        .then(|| info!("door: open"));
    tasks.push(("door", start_named(host, "door", door)?));

    let explosion = start_delayed(host, 3.0, || {
        info!("barrel: exploded");
        Ok(())
    })?;
    tasks.push(("explosion", explosion));

    let fade = start_action_over_time(
        host,
        ActionOverTime::new(1.5)
            .on_progress(|t| tracing::trace!("screen: fade {:.2}", t))
            .on_delta(|dt| tracing::trace!("screen: +{:.4}s", dt)),
    )?;
    tasks.push(("fade", fade));

    tasks.push(("blink", start_instruction(host, WaitFrames::new(30))?));

    let walk = |from: &'static str, to: &'static str, seconds: f32| {
        Script::new()
            .then(move || info!("guard: walking {} -> {}", from, to))
            .wait(ActionOverTime::new(seconds))
    };
    let patrol = Script::new()
        .nested(walk("gate", "tower", 1.5))
        .nested(walk("tower", "gate", 1.5))
        .then(|| info!("guard: patrol complete"));
    tasks.push(("patrol", start_named(host, "patrol", patrol)?));

    let alarm = Script::new()
        .wait_seconds(60.0)
        .then(|| info!("alarm: ringing"));
    tasks.push(("alarm", start_named(host, "alarm", alarm)?));

    if inject_failure {
        let sensor = start_delayed(host, 2.0, || bail!("sensor offline"))?;
        tasks.push(("sensor", sensor));
    }

    Ok(tasks)
}

fn run_demo(
    cfg: &DemoConfig,
    inject_failure: bool,
) -> Result<DemoSummary> {
    let source = TickSource::with_config(cfg.host.clone());
    let tasks = build_scene(&source.handle(), inject_failure)?;
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let mut simulated = 0.0f32;
    let mut failures = 0;
    for frame in 0..cfg.frames {
        if frame == cfg.frames / 2 {
            if let Some((_, alarm)) = tasks.iter().find(|(name, _)| *name == "alarm") {
                info!("alarm: disarmed");
                alarm.cancel();
            }
        }

        let jitter = if cfg.jitter > 0.0 {
            rng.random_range(-cfg.jitter..=cfg.jitter)
        } else {
            0.0
        };
        let dt = (cfg.dt + jitter).max(0.0);

        let report = if cfg.isolate {
            source.tick_isolated(dt)?
        } else {
            source.tick(dt)?
        };
        simulated += report.dt;
        failures += report.failures.len();
    }

    Ok(DemoSummary {
        frames: source.frame(),
        simulated_seconds: simulated,
        failures,
        remaining_subscribers: source.len(),
        tasks: tasks
            .into_iter()
            .map(|(name, handle)| TaskSummary {
                name: name.to_string(),
                state: handle.state().to_string(),
            })
            .collect(),
    })
}
