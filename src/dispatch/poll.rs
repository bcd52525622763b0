use std::fs;
use std::path::Path;

use chrono::{Duration, Utc};
use log::{info, warn};

use crate::dispatch::Engine;
use crate::error::DispatchError;
use crate::request::output::Output;
use crate::request::state::ProcessState;

/// Written by the scheduler when the job ran cleanly
pub static SUCCESS_SENTINEL: &str = "prueba.out";
/// Written by the scheduler when the job failed
pub static ERROR_SENTINEL: &str = "prueba.err";

/// Look for sentinel files in a job directory, success first
///
/// The contents of whichever sentinel is found become the result. Job output isn't always
/// UTF-8, invalid bytes are replaced rather than failing the poll.
pub fn check_sentinels(job_dir: &Path) -> Result<Option<Output>, DispatchError> {
    let success = job_dir.join(SUCCESS_SENTINEL);
    if success.is_file() {
        info!("Found {}", success.display());
        return Ok(Some(Output::ok(read_sentinel(&success)?)));
    }

    let error = job_dir.join(ERROR_SENTINEL);
    if error.is_file() {
        info!("Found {}", error.display());
        return Ok(Some(Output::failed(read_sentinel(&error)?)));
    }

    Ok(None)
}

fn read_sentinel(path: &Path) -> Result<String, DispatchError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl Engine {
    /// Check whether a request's job has ended, recording the outcome if it just did
    ///
    /// Returns `true` when the request is no longer PROCESSING. Requests in any other state are
    /// answered from the record alone without touching the job directory. How often to poll is
    /// up to the caller.
    pub fn poll_completion(&self, identifier: &str) -> Result<bool, DispatchError> {
        self.locks.with_lock(identifier, || -> Result<bool, DispatchError> {
            let mut request = self.find_request(identifier)?;
            if request.state != ProcessState::Processing {
                info!("Request {} already ended with state {}", identifier, request.state);
                return Ok(true);
            }

            match check_sentinels(request.job_dir())? {
                Some(output) => {
                    request.apply(output)?;
                    self.store.save(&request)?;
                    Ok(true)
                }
                None => {
                    info!("Request {} hasn't finished yet", identifier);
                    Ok(false)
                }
            }
        })
    }

    /// Fail requests that have been PROCESSING for longer than `max_age`
    ///
    /// A job that never produced a sentinel would otherwise stay PROCESSING forever. Returns
    /// the identifiers that were failed.
    pub fn expire_stale(&self, max_age: Duration) -> Result<Vec<String>, DispatchError> {
        let cutoff = Utc::now() - max_age;
        let mut expired = Vec::new();

        for candidate in self.store.find_by_state(ProcessState::Processing)? {
            let id = candidate.identifier;
            let failed = self.locks.with_lock(&id, || -> Result<bool, DispatchError> {
                let mut request = self.find_request(&id)?;
                let touched = request.last_update.unwrap_or(request.creation_date);
                if request.state != ProcessState::Processing || touched > cutoff {
                    return Ok(false);
                }
                warn!("Request {} has been processing since {}, failing it", id, touched);
                request.apply(Output::failed(format!(
                    "no completion sentinel found within {} minutes of the last update", max_age.num_minutes())))?;
                self.store.save(&request)?;
                Ok(true)
            })?;
            if failed {
                expired.push(id);
            }
        }

        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::config::Config;
    use crate::db::store::{RequestStore, SqliteStore};
    use crate::request::processing::ProcessingRequest;

    struct Fixture {
        dir: TempDir,
        store: Arc<SqliteStore>,
        engine: Engine,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let config = Config::new(&dir.path().join("templates"), &dir.path().join("resources"));
        let engine = Engine::new(config, store.clone());
        Fixture { dir, store, engine }
    }

    impl Fixture {
        /// Store a request in `state`, with its job directory inside the temp dir
        fn request(&self, id: &str, state: ProcessState) -> ProcessingRequest {
            let job_dir = self.dir.path().join(id);
            fs::create_dir_all(&job_dir).unwrap();
            let mut request = ProcessingRequest::new(id, "java", vec![], "Main.java",
                                                     &format!("{}/", job_dir.display()), None);
            self.store.insert(&request, &[]).unwrap();
            request.state = state;
            self.store.save(&request).unwrap();
            request
        }

        fn sentinel(&self, id: &str, name: &str, content: impl AsRef<[u8]>) {
            fs::write(self.dir.path().join(id).join(name), content).unwrap();
        }

        fn stored(&self, id: &str) -> ProcessingRequest {
            self.store.load(id).unwrap().unwrap()
        }
    }

    #[test]
    fn error_sentinel_fails_the_request() {
        let f = fixture();
        f.request("c", ProcessState::Processing);
        f.sentinel("c", ERROR_SENTINEL, "NullPointerException");

        assert!(f.engine.poll_completion("c").unwrap());

        let stored = f.stored("c");
        assert_eq!(stored.state, ProcessState::FinishedWithErrors);
        assert_eq!(stored.result, "NullPointerException");
    }

    #[test]
    fn success_sentinel_wins_over_error() {
        let f = fixture();
        f.request("s", ProcessState::Processing);
        f.sentinel("s", SUCCESS_SENTINEL, "42\n");
        f.sentinel("s", ERROR_SENTINEL, "warning: deprecated");

        assert!(f.engine.poll_completion("s").unwrap());

        let stored = f.stored("s");
        assert_eq!(stored.state, ProcessState::FinishedOk);
        assert_eq!(stored.result, "42\n");
    }

    #[test]
    fn sentinel_that_is_not_utf8_still_ends_the_job() {
        let f = fixture();
        f.request("latin1", ProcessState::Processing);
        f.sentinel("latin1", SUCCESS_SENTINEL, b"media = 4,2 a\xf1o\n");

        assert!(f.engine.poll_completion("latin1").unwrap());

        let stored = f.stored("latin1");
        assert_eq!(stored.state, ProcessState::FinishedOk);
        assert_eq!(stored.result, "media = 4,2 a\u{FFFD}o\n");
    }

    #[test]
    fn no_sentinel_means_not_finished() {
        let f = fixture();
        f.request("p", ProcessState::Processing);

        assert!(!f.engine.poll_completion("p").unwrap());
        assert_eq!(f.stored("p").state, ProcessState::Processing);
    }

    #[test]
    fn finished_requests_ignore_the_job_directory() {
        let f = fixture();
        f.request("done", ProcessState::FinishedOk);
        fs::remove_dir_all(f.dir.path().join("done")).unwrap();

        assert!(f.engine.poll_completion("done").unwrap());
        assert!(f.engine.poll_completion("done").unwrap());
        assert_eq!(f.stored("done").state, ProcessState::FinishedOk);
    }

    #[test]
    fn terminal_state_is_never_overwritten_by_sentinels() {
        let f = fixture();
        let before = f.request("e", ProcessState::FinishedWithErrors);
        f.sentinel("e", SUCCESS_SENTINEL, "late output");

        assert!(f.engine.poll_completion("e").unwrap());

        let stored = f.stored("e");
        assert_eq!(stored.state, ProcessState::FinishedWithErrors);
        assert_eq!(stored.result, before.result);
    }

    #[test]
    fn unknown_and_blank_identifiers_are_validation_errors() {
        let f = fixture();
        assert!(matches!(f.engine.poll_completion("missing"), Err(DispatchError::NotFound(_))));
        assert!(matches!(f.engine.poll_completion("  "), Err(DispatchError::Validation(_))));
    }

    #[test]
    fn stale_processing_requests_are_expired() {
        let f = fixture();
        let mut old = f.request("old", ProcessState::Processing);
        old.last_update = Some(Utc::now() - Duration::hours(3));
        f.store.save(&old).unwrap();
        f.request("fresh", ProcessState::Processing);
        f.request("created", ProcessState::Created);

        let expired = f.engine.expire_stale(Duration::hours(1)).unwrap();

        assert_eq!(expired, vec!["old".to_string()]);
        assert_eq!(f.stored("old").state, ProcessState::FinishedWithErrors);
        assert!(f.stored("old").result.contains("60 minutes"));
        assert_eq!(f.stored("fresh").state, ProcessState::Processing);
        assert_eq!(f.stored("created").state, ProcessState::Created);
    }
}
