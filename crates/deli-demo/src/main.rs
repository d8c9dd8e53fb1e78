//! deli-demo: run a shift headless with a scripted player.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use deli_core::persistence::{MemoryStore, SaveStore};
use deli_data::FileStore;
use deli_demo::{AutopilotConfig, DemoError, RunOptions, Session, verify_determinism};
use tracing_subscriber::EnvFilter;

/// Run an Orbital Deli shift without a window
#[derive(Parser, Debug)]
#[command(name = "deli-demo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the catalog, tuning and stock files
    #[arg(short, long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/data"))]
    data: PathBuf,

    /// Save file (.json or .bin); in-memory when omitted
    #[arg(long)]
    save: Option<PathBuf>,

    /// Seconds to simulate
    #[arg(long, default_value = "120")]
    seconds: f64,

    /// Frames per second handed to the shift
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Random seed (default: from the tuning file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Chance of the autopilot placing a wrong ingredient
    #[arg(long, default_value = "0.05")]
    mistakes: f64,

    /// Seconds between two autopilot actions
    #[arg(long, default_value = "0.25")]
    reaction: f64,

    /// Start over after too many misses instead of stopping
    #[arg(long)]
    restart: bool,

    /// Run twice and compare state hashes every frame
    #[arg(long)]
    verify: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn options(&self) -> RunOptions {
        RunOptions {
            seconds: self.seconds,
            frame_secs: 1.0 / f64::from(self.fps.max(1)),
            seed: self.seed,
            restart_on_termination: self.restart,
            autopilot: AutopilotConfig {
                reaction_secs: self.reaction,
                mistake_rate: self.mistakes,
                seed: self.seed.unwrap_or(AutopilotConfig::default().seed),
                ..AutopilotConfig::default()
            },
        }
    }
}

fn run(args: &Args) -> Result<(), DemoError> {
    let options = args.options();

    if args.verify {
        let hash = verify_determinism(&args.data, &options)?;
        println!("deterministic: final state hash {hash:#018x}");
    }

    let store: Box<dyn SaveStore> = match &args.save {
        Some(path) => Box::new(FileStore::new(path)),
        None => Box::new(MemoryStore::new()),
    };
    let mut session = Session::load(&args.data, store, &options)?;
    session.run_frames(options.frame_count()?);
    session.shift_mut().flush_save();

    let report = session.report();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
