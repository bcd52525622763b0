use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::language::Language;
use crate::request::output::Output;
use crate::request::state::ProcessState;

/// A source file submitted for processing on the cluster
///
/// The job directory (`base_path`) holds the source file, the rendered launch script and, once
/// the scheduler has run the job, the sentinel files. `base_path` is kept as given because
/// commands are built by plain concatenation with it.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingRequest {
    pub identifier: String,
    /// Free text as received by intake, see [`ProcessingRequest::language`]
    pub language: String,
    pub file_name: String,
    pub base_path: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub state: ProcessState,
    pub result: String,
    pub creation_date: DateTime<Utc>,
    pub last_update: Option<DateTime<Utc>>,
    pub investigator_id: Option<i64>,
}

/// An auxiliary file (e.g. a jar) the source needs to compile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResource {
    pub name: String,
}

impl ProcessResource {
    pub fn new(name: impl Into<String>) -> Self {
        ProcessResource { name: name.into() }
    }
}

impl ProcessingRequest {
    pub fn new(identifier: &str, language: &str, bytes: Vec<u8>, file_name: &str, base_path: &str,
               investigator_id: Option<i64>) -> ProcessingRequest {
        ProcessingRequest {
            identifier: identifier.to_string(),
            language: language.to_string(),
            file_name: file_name.to_string(),
            base_path: base_path.to_string(),
            bytes,
            state: ProcessState::Created,
            result: String::new(),
            creation_date: Utc::now(),
            last_update: None,
            investigator_id,
        }
    }

    pub fn language(&self) -> Result<Language, DispatchError> {
        self.language.parse()
    }

    pub fn job_dir(&self) -> &Path {
        Path::new(&self.base_path)
    }

    pub fn source_path(&self) -> PathBuf {
        self.job_dir().join(&self.file_name)
    }

    /// File name without its extension, i.e. the Java main class
    pub fn file_base_name(&self) -> String {
        Path::new(&self.file_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Move to a new state, refusing anything the state machine doesn't allow
    pub fn transition(&mut self, to: ProcessState) -> Result<(), DispatchError> {
        if !self.state.can_transition(to) {
            return Err(DispatchError::IllegalTransition { from: self.state, to });
        }
        info!("Request {} {} -> {}", self.identifier, self.state, to);
        self.state = to;
        self.last_update = Some(Utc::now());
        Ok(())
    }

    /// Fold the outcome of a dispatch or poll into the record
    pub fn apply(&mut self, output: Output) -> Result<(), DispatchError> {
        if output.state != self.state {
            self.transition(output.state)?;
        } else {
            self.last_update = Some(Utc::now());
        }
        self.result = output.result;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProcessingRequest {
        ProcessingRequest::new("abc", "java", vec![], "Main.java", "/jobs/2/", Some(7))
    }

    #[test]
    fn new_requests_start_created() {
        let request = request();
        assert_eq!(request.state, ProcessState::Created);
        assert!(request.last_update.is_none());
        assert!(request.result.is_empty());
    }

    #[test]
    fn paths_are_derived_from_base_path() {
        let request = request();
        assert_eq!(request.source_path(), PathBuf::from("/jobs/2/Main.java"));
        assert_eq!(request.file_base_name(), "Main");
    }

    #[test]
    fn skipping_processing_is_rejected() {
        let mut request = request();
        let err = request.transition(ProcessState::FinishedOk).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(request.state, ProcessState::Created);
    }

    #[test]
    fn apply_records_result_and_state() {
        let mut request = request();
        request.transition(ProcessState::Processing).unwrap();
        request.apply(Output::failed("boom")).unwrap();
        assert_eq!(request.state, ProcessState::FinishedWithErrors);
        assert_eq!(request.result, "boom");
        assert!(request.last_update.is_some());
    }

    #[test]
    fn apply_can_keep_processing() {
        let mut request = request();
        request.transition(ProcessState::Processing).unwrap();
        request.apply(Output::processing("12345.cluster")).unwrap();
        assert_eq!(request.state, ProcessState::Processing);
        assert_eq!(request.result, "12345.cluster");
    }
}
