//! Library side of `profile-sync`
//!
//! Config file handling and the script replayer live here so integration
//! tests can drive them without spawning the binary.

pub mod script;
pub mod settings;
