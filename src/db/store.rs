use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::open::{open_db, open_in_memory};
use crate::db::request::load::{find_all, find_by_investigator, find_by_state, load_request, load_resources};
use crate::db::request::update::{add_resource, insert_request, save_request};
use crate::error::DispatchError;
use crate::request::processing::{ProcessResource, ProcessingRequest};
use crate::request::state::ProcessState;
use crate::WorkingDirectory;

/// Keyed access to request records
///
/// The dispatch engine only ever needs `load` and `save`. The gateway does no locking of its
/// own: the engine serialises load-then-save per identifier.
pub trait RequestStore: Send + Sync {
    fn load(&self, identifier: &str) -> Result<Option<ProcessingRequest>, DispatchError>;

    fn save(&self, request: &ProcessingRequest) -> Result<(), DispatchError>;

    fn resources(&self, identifier: &str) -> Result<Vec<ProcessResource>, DispatchError>;

    fn find_by_state(&self, state: ProcessState) -> Result<Vec<ProcessingRequest>, DispatchError>;
}

/// The default gateway, one SQLite connection shared behind a mutex
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(wd: &WorkingDirectory) -> Result<SqliteStore, DispatchError> {
        Ok(SqliteStore { conn: Mutex::new(open_db(wd)?) })
    }

    pub fn in_memory() -> Result<SqliteStore, DispatchError> {
        Ok(SqliteStore { conn: Mutex::new(open_in_memory()?) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // a panic mid-statement can't leave the connection itself in a bad state
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new request together with its resources, in one transaction
    pub fn insert(&self, request: &ProcessingRequest, resources: &[ProcessResource]) -> Result<(), DispatchError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        insert_request(&tx, request)?;
        for resource in resources {
            add_resource(&tx, &request.identifier, resource)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn find_all(&self) -> Result<Vec<ProcessingRequest>, DispatchError> {
        Ok(find_all(&self.conn())?)
    }

    pub fn find_by_investigator(&self, investigator_id: i64) -> Result<Vec<ProcessingRequest>, DispatchError> {
        Ok(find_by_investigator(&self.conn(), investigator_id)?)
    }
}

impl RequestStore for SqliteStore {
    fn load(&self, identifier: &str) -> Result<Option<ProcessingRequest>, DispatchError> {
        Ok(load_request(&self.conn(), identifier)?)
    }

    fn save(&self, request: &ProcessingRequest) -> Result<(), DispatchError> {
        match save_request(&self.conn(), request)? {
            0 => Err(DispatchError::NotFound(request.identifier.clone())),
            _ => Ok(()),
        }
    }

    fn resources(&self, identifier: &str) -> Result<Vec<ProcessResource>, DispatchError> {
        Ok(load_resources(&self.conn(), identifier)?)
    }

    fn find_by_state(&self, state: ProcessState) -> Result<Vec<ProcessingRequest>, DispatchError> {
        Ok(find_by_state(&self.conn(), state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(requests: &[ProcessingRequest]) -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        for request in requests {
            store.insert(request, &[]).unwrap();
        }
        store
    }

    #[test]
    fn insert_then_load() {
        let request = ProcessingRequest::new("a1", "python", b"print(1)".to_vec(), "a.py", "/jobs/1/", Some(3));
        let store = store_with(&[request.clone()]);

        let loaded = store.load("a1").unwrap().unwrap();
        assert_eq!(loaded.identifier, "a1");
        assert_eq!(loaded.language, "python");
        assert_eq!(loaded.bytes, b"print(1)");
        assert_eq!(loaded.state, ProcessState::Created);
        assert_eq!(loaded.creation_date, request.creation_date);
        assert_eq!(loaded.investigator_id, Some(3));
    }

    #[test]
    fn unknown_identifier_loads_none() {
        let store = store_with(&[]);
        assert!(store.load("nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_identifier_is_refused() {
        let request = ProcessingRequest::new("a1", "python", vec![], "a.py", "/jobs/1/", None);
        let store = store_with(&[request.clone()]);
        assert!(matches!(store.insert(&request, &[]), Err(DispatchError::Storage(_))));
    }

    #[test]
    fn save_updates_state_and_result() {
        let mut request = ProcessingRequest::new("a1", "python", vec![], "a.py", "/jobs/1/", None);
        let store = store_with(&[request.clone()]);

        request.transition(ProcessState::Processing).unwrap();
        request.result = "42.cluster".to_string();
        store.save(&request).unwrap();

        let loaded = store.load("a1").unwrap().unwrap();
        assert_eq!(loaded.state, ProcessState::Processing);
        assert_eq!(loaded.result, "42.cluster");
        assert_eq!(loaded.last_update, request.last_update);
    }

    #[test]
    fn save_of_unknown_request_is_not_found() {
        let store = store_with(&[]);
        let request = ProcessingRequest::new("ghost", "python", vec![], "a.py", "/jobs/1/", None);
        assert!(matches!(store.save(&request), Err(DispatchError::NotFound(_))));
    }

    #[test]
    fn resources_keep_insertion_order() {
        let store = SqliteStore::in_memory().unwrap();
        let request = ProcessingRequest::new("j1", "java", vec![], "Main.java", "/jobs/2/", None);
        let resources = [ProcessResource::new("z.jar"), ProcessResource::new("a.jar")];
        store.insert(&request, &resources).unwrap();

        assert_eq!(store.resources("j1").unwrap(), resources.to_vec());
        assert!(store.resources("other").unwrap().is_empty());
    }

    #[test]
    fn finders() {
        let store = store_with(&[
            ProcessingRequest::new("a", "python", vec![], "a.py", "/jobs/a/", Some(1)),
            ProcessingRequest::new("b", "r", vec![], "b.R", "/jobs/b/", Some(2)),
            ProcessingRequest::new("c", "java", vec![], "C.java", "/jobs/c/", Some(1)),
        ]);

        let ids = |requests: Vec<ProcessingRequest>| -> Vec<String> {
            requests.into_iter().map(|r| r.identifier).collect()
        };
        assert_eq!(ids(store.find_all().unwrap()), ["a", "b", "c"]);
        assert_eq!(ids(store.find_by_investigator(1).unwrap()), ["a", "c"]);
        assert_eq!(ids(store.find_by_state(ProcessState::Created).unwrap()), ["a", "b", "c"]);
        assert!(store.find_by_state(ProcessState::Processing).unwrap().is_empty());
    }
}
