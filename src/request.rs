//! Processing requests and the state machine they move through

/// Request lifecycle states and the legal transitions between them
pub mod state;
/// The request record and its auxiliary resources
pub mod processing;
/// Outcome of one dispatch or poll, folded back into a request
pub mod output;
