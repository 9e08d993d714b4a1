//! Periodic background rescheduling.
//!
//! Registers and runs the two recurring jobs that keep prayer and reminder
//! alerts registered across app restarts, process death, and date rollover.

pub mod jobs;
pub mod rescheduler;
pub mod runner;

pub use jobs::{JobOutcome, JobRunner, PeriodicJobSpec};
pub use rescheduler::Rescheduler;
pub use runner::TokioJobRunner;
