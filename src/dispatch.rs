//! The dispatch engine: submits requests to the cluster and tracks them until they finish
//!
//! [`Engine`] holds everything a submission or poll needs and does the work synchronously.
//! [`pool::Dispatcher`] puts a bounded worker pool in front of it so that callers never wait on
//! the backoff delay, a compiler or the scheduler.

use std::sync::Arc;

use crate::cluster::script;
use crate::config::Config;
use crate::db::store::RequestStore;
use crate::dispatch::lock::IdentifierLocks;
use crate::error::DispatchError;
use crate::request::processing::ProcessingRequest;

/// Serialise load-then-save on one request record
pub mod lock;
/// Compile, render and hand off one request
pub mod submit;
/// Detect finished jobs from their sentinel files
pub mod poll;
/// Bounded worker pool and the notification channel
pub mod pool;

pub struct Engine {
    pub config: Config,
    store: Arc<dyn RequestStore>,
    locks: IdentifierLocks,
}

impl Engine {
    pub fn new(config: Config, store: Arc<dyn RequestStore>) -> Engine {
        Engine { config, store, locks: IdentifierLocks::default() }
    }

    pub fn store(&self) -> &dyn RequestStore {
        self.store.as_ref()
    }

    /// Fails with a validation error naming the template file when the request's language has
    /// no launch script template
    pub fn validate_language_template(&self, request: &ProcessingRequest) -> Result<(), DispatchError> {
        script::validate_language_template(&self.config, request).map(|_| ())
    }

    /// Load a request, refusing blank identifiers
    pub fn find_request(&self, identifier: &str) -> Result<ProcessingRequest, DispatchError> {
        if identifier.trim().is_empty() {
            return Err(DispatchError::Validation("request <identifier> must not be blank".to_string()));
        }
        self.store.load(identifier)?
            .ok_or_else(|| DispatchError::NotFound(identifier.to_string()))
    }
}
