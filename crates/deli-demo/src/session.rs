use std::cell::{Ref, RefCell};
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use deli_core::fixed::{f64_to_fixed64, fixed64_to_f64, format_cents};
use deli_core::persistence::{MemoryStore, SaveStore};
use deli_core::{Cents, Fixed64, Shift, ShiftPhase};
use deli_data::{ShiftData, load_shift_data};
use deli_stats::{ShiftStats, StatsConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::autopilot::{Autopilot, AutopilotConfig};
use crate::error::DemoError;

/// How a headless run is driven.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Wall-clock seconds to simulate. The run stops early when the shift
    /// closes itself.
    pub seconds: f64,
    /// Delta handed to `Shift::advance` per frame.
    pub frame_secs: f64,
    /// Replaces the seed from the tuning file.
    pub seed: Option<u64>,
    /// Start a new shift after a termination instead of stopping.
    pub restart_on_termination: bool,
    pub autopilot: AutopilotConfig,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seconds: 120.0,
            frame_secs: 1.0 / 60.0,
            seed: None,
            restart_on_termination: false,
            autopilot: AutopilotConfig::default(),
        }
    }
}

impl RunOptions {
    /// Frames needed to cover `seconds`.
    pub fn frame_count(&self) -> Result<u64, DemoError> {
        if !self.frame_secs.is_finite() || self.frame_secs <= 0.0 {
            return Err(DemoError::InvalidOptions {
                detail: format!("frame length must be positive, got {}", self.frame_secs),
            });
        }
        if !self.seconds.is_finite() || self.seconds < 0.0 {
            return Err(DemoError::InvalidOptions {
                detail: format!("run length must be non-negative, got {}", self.seconds),
            });
        }
        Ok((self.seconds / self.frame_secs).ceil() as u64)
    }
}

/// One open shift, the autopilot playing it and the stats listening to it.
pub struct Session {
    shift: Shift,
    stats: Rc<RefCell<ShiftStats>>,
    autopilot: Autopilot,
    frame: Fixed64,
    frames: u64,
    restarts: u32,
    restart_on_termination: bool,
}

impl Session {
    /// Load shift data from `dir` and open a shift over `store`.
    pub fn load(dir: &Path, store: Box<dyn SaveStore>, options: &RunOptions) -> Result<Self, DemoError> {
        let data = load_shift_data(dir).map_err(|source| DemoError::DataLoad {
            dir: dir.to_path_buf(),
            source,
        })?;
        Self::new(data, store, options)
    }

    pub fn new(data: ShiftData, store: Box<dyn SaveStore>, options: &RunOptions) -> Result<Self, DemoError> {
        options.frame_count()?;
        let fallback = data.fresh_save();
        let config = match options.seed {
            Some(seed) => data.config.with_seed(seed),
            None => data.config,
        };
        let mut shift = Shift::new(config, data.catalog, store, fallback);
        let stats = ShiftStats::attach(&mut shift, StatsConfig::default());
        shift.open_store();
        info!(
            seed = shift.config().seed,
            wallet = %format_cents(shift.wallet()),
            "session started"
        );

        Ok(Self {
            shift,
            stats,
            autopilot: Autopilot::new(&options.autopilot),
            frame: f64_to_fixed64(options.frame_secs),
            frames: 0,
            restarts: 0,
            restart_on_termination: options.restart_on_termination,
        })
    }

    /// Advance the shift by one frame and let the autopilot react.
    pub fn frame(&mut self) {
        self.shift.advance(self.frame);
        self.autopilot.act(&mut self.shift, self.frame);
        if self.shift.is_terminated() && self.restart_on_termination {
            info!(restarts = self.restarts + 1, "restarting after termination");
            self.shift.restart();
            self.restarts += 1;
        }
        self.frames += 1;
    }

    /// Nothing left to play: the shift closed, or it ended and will not
    /// restart.
    pub fn is_finished(&self) -> bool {
        match self.shift.phase() {
            ShiftPhase::Closed => true,
            ShiftPhase::Terminated => !self.restart_on_termination,
            ShiftPhase::Idle | ShiftPhase::Open | ShiftPhase::Closing => false,
        }
    }

    /// Run up to `frames` frames. Returns the number actually run.
    pub fn run_frames(&mut self, frames: u64) -> u64 {
        let start = self.frames;
        for _ in 0..frames {
            if self.is_finished() {
                debug!(frame = self.frames, phase = ?self.shift.phase(), "session finished early");
                break;
            }
            self.frame();
        }
        self.frames - start
    }

    pub fn shift(&self) -> &Shift {
        &self.shift
    }

    pub fn shift_mut(&mut self) -> &mut Shift {
        &mut self.shift
    }

    pub fn stats(&self) -> Ref<'_, ShiftStats> {
        self.stats.borrow()
    }

    pub fn autopilot(&self) -> &Autopilot {
        &self.autopilot
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn report(&self) -> RunReport {
        let stats = self.stats.borrow();
        let score = self.shift.score();
        RunReport {
            frames: self.frames,
            ticks: self.shift.tick(),
            elapsed_secs: fixed64_to_f64(self.shift.elapsed()),
            state_hash: self.shift.state_hash(),
            phase: self.shift.phase(),
            score: score.current_score,
            high_score: score.high_score.max(score.current_score),
            best_combo: stats.best_combo,
            money: score.money,
            wallet: self.shift.wallet(),
            spawned: stats.spawned,
            delivered: stats.delivered,
            missed: stats.missed,
            wrong_placements: stats.wrong_placements,
            terminations: stats.terminations,
            restarts: self.restarts,
            actions: self.autopilot.actions(),
            purchases: self.autopilot.purchases(),
            accuracy: stats.accuracy().map(fixed64_to_f64),
            average_service_ticks: stats.average_service_ticks().map(fixed64_to_f64),
        }
    }
}

/// End-of-run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub frames: u64,
    pub ticks: u64,
    pub elapsed_secs: f64,
    pub state_hash: u64,
    pub phase: ShiftPhase,
    pub score: u64,
    pub high_score: u64,
    pub best_combo: u32,
    /// Earned this shift, in cents.
    pub money: Cents,
    pub wallet: Cents,
    pub spawned: u32,
    pub delivered: u32,
    pub missed: u32,
    pub wrong_placements: u32,
    pub terminations: u32,
    pub restarts: u32,
    pub actions: u32,
    pub purchases: Cents,
    pub accuracy: Option<f64>,
    pub average_service_ticks: Option<f64>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:?} after {:.1}s ({} ticks, {} frames)",
            self.phase, self.elapsed_secs, self.ticks, self.frames
        )?;
        writeln!(f, "  score      {} (high {})", self.score, self.high_score)?;
        writeln!(
            f,
            "  orders     {} spawned, {} delivered, {} missed",
            self.spawned, self.delivered, self.missed
        )?;
        writeln!(
            f,
            "  mistakes   {} wrong, best combo {}",
            self.wrong_placements, self.best_combo
        )?;
        if let Some(accuracy) = self.accuracy {
            writeln!(f, "  accuracy   {:.1}%", accuracy * 100.0)?;
        }
        if let Some(ticks) = self.average_service_ticks {
            writeln!(f, "  service    {ticks:.1} ticks on average")?;
        }
        writeln!(
            f,
            "  money      {} earned, {} spent, wallet {}",
            format_cents(self.money),
            format_cents(self.purchases),
            format_cents(self.wallet)
        )?;
        if self.terminations > 0 {
            writeln!(f, "  ended      {} time(s), {} restart(s)", self.terminations, self.restarts)?;
        }
        write!(f, "  state hash {:#018x}", self.state_hash)
    }
}

/// Play the same options twice over fresh in-memory saves and compare state
/// hashes after every frame. Returns the final hash.
pub fn verify_determinism(dir: &Path, options: &RunOptions) -> Result<u64, DemoError> {
    let frames = options.frame_count()?;
    let mut left = Session::load(dir, Box::new(MemoryStore::new()), options)?;
    let mut right = Session::load(dir, Box::new(MemoryStore::new()), options)?;

    for frame in 0..frames {
        if left.is_finished() {
            break;
        }
        left.frame();
        right.frame();
        let (l, r) = (left.shift().state_hash(), right.shift().state_hash());
        if l != r {
            return Err(DemoError::Desync { frame, left: l, right: r });
        }
    }
    Ok(left.shift().state_hash())
}
