use crate::request::state::ProcessState;

/// Result text and the state it leads to
///
/// Produced once per dispatch or poll and folded into the request with
/// [`ProcessingRequest::apply`](crate::request::processing::ProcessingRequest::apply). Never
/// stored on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub result: String,
    pub state: ProcessState,
}

impl Output {
    pub fn ok(result: impl Into<String>) -> Self {
        Output { result: result.into(), state: ProcessState::FinishedOk }
    }

    pub fn failed(result: impl Into<String>) -> Self {
        Output { result: result.into(), state: ProcessState::FinishedWithErrors }
    }

    /// Handed off, still waiting on the cluster
    pub fn processing(result: impl Into<String>) -> Self {
        Output { result: result.into(), state: ProcessState::Processing }
    }
}
