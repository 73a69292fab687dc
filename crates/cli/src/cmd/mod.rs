//! CLI command implementations

pub mod check_handle;
pub mod config;
pub mod run;
