pub use crate::errors::{CaseError, HarnessError, HarnessResult};

pub mod cli;
pub mod config;
pub mod errors;
pub mod harness;
