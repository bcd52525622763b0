//! Submit processing requests to a shared compute cluster and track them until they finish
//!
//! A request (a Java, Python or R source file plus optional compile resources) is compiled if
//! needed, wrapped in a launch script rendered from a per-language template and handed to the
//! cluster scheduler. Completion is detected later from sentinel files the scheduler leaves in
//! the job directory.

use std::path::PathBuf;

/// Runtime configuration: folders, toolchain, backoff and pool sizing
pub mod config;
pub mod error;
pub mod language;
/// Request records, states and outcomes
pub mod request;
pub mod process;
pub mod cluster;
pub mod db;
pub mod dispatch;
/// Human readable request summaries
pub mod report;

/// Directory holding the request database
pub struct WorkingDirectory {
    pub path: PathBuf,
}
