//! Processing request loading and updating
//!
//! Rows are mapped to and from [`ProcessingRequest`](crate::request::processing::ProcessingRequest).
//! Inserting is the intake side's job, updating state and result is the dispatch engine's.

pub mod load;
pub mod update;
