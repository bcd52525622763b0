use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::DispatchError;
use crate::request::processing::{ProcessResource, ProcessingRequest};
use crate::request::state::ProcessState;

static COLUMNS: &str = "identifier, language, file_name, base_path, bytes, state, result, \
    creation_date, last_update, investigator_id";

pub fn load_request(conn: &Connection, identifier: &str) -> rusqlite::Result<Option<ProcessingRequest>> {
    let sql = format!("SELECT {COLUMNS} FROM processing_request WHERE identifier = ?1");
    conn.query_row(&sql, params![identifier], from_row).optional()
}

pub fn load_resources(conn: &Connection, identifier: &str) -> rusqlite::Result<Vec<ProcessResource>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM process_resource WHERE request_identifier = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![identifier], |row| Ok(ProcessResource { name: row.get(0)? }))?;
    rows.collect()
}

pub fn find_all(conn: &Connection) -> rusqlite::Result<Vec<ProcessingRequest>> {
    let sql = format!("SELECT {COLUMNS} FROM processing_request ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect()
}

pub fn find_by_investigator(conn: &Connection, investigator_id: i64) -> rusqlite::Result<Vec<ProcessingRequest>> {
    let sql = format!("SELECT {COLUMNS} FROM processing_request WHERE investigator_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![investigator_id], from_row)?;
    rows.collect()
}

pub fn find_by_state(conn: &Connection, state: ProcessState) -> rusqlite::Result<Vec<ProcessingRequest>> {
    let sql = format!("SELECT {COLUMNS} FROM processing_request WHERE state = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![state.as_str()], from_row)?;
    rows.collect()
}

fn from_row(row: &Row) -> rusqlite::Result<ProcessingRequest> {
    let state: String = row.get(5)?;
    let creation_date: String = row.get(7)?;
    let last_update: Option<String> = row.get(8)?;

    Ok(ProcessingRequest {
        identifier: row.get(0)?,
        language: row.get(1)?,
        file_name: row.get(2)?,
        base_path: row.get(3)?,
        bytes: row.get::<_, Option<Vec<u8>>>(4)?.unwrap_or_default(),
        state: state.parse().map_err(|err| conversion_error(5, err))?,
        result: row.get(6)?,
        creation_date: parse_date(7, &creation_date)?,
        last_update: last_update.map(|date| parse_date(8, &date)).transpose()?,
        investigator_id: row.get(9)?,
    })
}

fn parse_date(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn conversion_error(idx: usize, err: DispatchError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}
