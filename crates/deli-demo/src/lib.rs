//! Headless runner for the deli pipeline.
//!
//! Loads a data directory, opens a shift, lets a scripted player work the
//! counter and summarizes the result.
//!
//! # Usage
//!
//! ```rust,ignore
//! use deli_demo::session::{RunOptions, Session};
//!
//! let options = RunOptions::default();
//! let mut session = Session::load(dir, Box::new(MemoryStore::new()), &options)?;
//! session.run_frames(options.frame_count()?);
//! println!("{}", session.report());
//! ```

pub mod autopilot;
pub mod error;
pub mod session;

pub use autopilot::{Action, Autopilot, AutopilotConfig};
pub use error::DemoError;
pub use session::{RunOptions, RunReport, Session, verify_determinism};
