use log::info;
use rusqlite::{params, Connection};

use crate::request::processing::{ProcessResource, ProcessingRequest};

/// Store a new request, as received by intake
pub fn insert_request(conn: &Connection, request: &ProcessingRequest) -> rusqlite::Result<()> {
    info!("Adding request {} to db", request.identifier);
    conn.execute(
        "INSERT INTO processing_request \
         (identifier, language, file_name, base_path, bytes, state, result, creation_date, last_update, investigator_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            request.identifier,
            request.language,
            request.file_name,
            request.base_path,
            request.bytes,
            request.state.as_str(),
            request.result,
            request.creation_date.to_rfc3339(),
            request.last_update.map(|date| date.to_rfc3339()),
            request.investigator_id,
        ],
    )?;
    Ok(())
}

pub fn add_resource(conn: &Connection, identifier: &str, resource: &ProcessResource) -> rusqlite::Result<()> {
    info!("Adding resource {} to request {}", resource.name, identifier);
    conn.execute(
        "INSERT INTO process_resource (request_identifier, name) VALUES (?1, ?2)",
        params![identifier, resource.name],
    )?;
    Ok(())
}

/// Write back the mutable part of a request: state, result and last update
///
/// Returns the number of rows changed, zero means the identifier isn't in the database.
pub fn save_request(conn: &Connection, request: &ProcessingRequest) -> rusqlite::Result<usize> {
    let id = &request.identifier;
    info!("Updating {id} with state {}", request.state);
    conn.execute(
        "UPDATE processing_request SET state = ?1, result = ?2, last_update = ?3 WHERE identifier = ?4",
        params![
            request.state.as_str(),
            request.result,
            request.last_update.map(|date| date.to_rfc3339()),
            id,
        ],
    )
}
