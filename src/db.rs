//! All request state is stored in a SQLite database

/// Connect to a SQLite database
pub mod open;
/// Request and resource queries
pub mod request;
/// Keyed load/save gateway used by the dispatch engine
pub mod store;
