//! Command implementations for the graft CLI
//!
//! Each command module handles the CLI interface and delegates to
//! graft-core for the actual work.

pub mod merge;
