use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Created,
    Processing,
    FinishedOk,
    FinishedWithErrors
}

/// A simple way to keep track of request state.
///
/// Requests are created by intake, picked up by a dispatch worker (PROCESSING) and end in one
/// of two terminal states. Nothing ever moves backwards, and finished requests stay finished.
impl ProcessState {
    /// db column values, also used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Created => "CREATED",
            ProcessState::Processing => "PROCESSING",
            ProcessState::FinishedOk => "FINISHED_OK",
            ProcessState::FinishedWithErrors => "FINISHED_WITH_ERRORS"
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::FinishedOk | ProcessState::FinishedWithErrors)
    }

    pub fn can_transition(&self, to: ProcessState) -> bool {
        matches!((self, to),
            (ProcessState::Created, ProcessState::Processing)
            | (ProcessState::Processing, ProcessState::FinishedOk)
            | (ProcessState::Processing, ProcessState::FinishedWithErrors))
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessState {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(ProcessState::Created),
            "PROCESSING" => Ok(ProcessState::Processing),
            "FINISHED_OK" => Ok(ProcessState::FinishedOk),
            "FINISHED_WITH_ERRORS" => Ok(ProcessState::FinishedWithErrors),
            _ => Err(DispatchError::Validation(format!("unknown process state <{s}>")))
        }
    }
}
