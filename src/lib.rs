pub mod active_set;
pub mod bundle;
pub mod cli;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod generate;
pub mod hooks;
pub mod post_install;
pub mod process;
pub mod registry;

pub use engine::{ActivationReport, DeactivationOutcome, LifecycleEngine};
pub use error::{LifecycleError, Result};
