//! Turn a processing request into something the cluster scheduler can run

/// Build compile and run command lines for each language
pub mod strategy;

/// Render per-language launch script templates
pub mod script;
