use log::{info, warn};

use crate::cluster::script::{render, LaunchScript};
use crate::cluster::strategy::plan_request;
use crate::dispatch::Engine;
use crate::error::DispatchError;
use crate::process::invoke::execute;
use crate::request::output::Output;
use crate::request::processing::{ProcessResource, ProcessingRequest};
use crate::request::state::ProcessState;

impl Engine {
    /// Checks done before a request is accepted for dispatch
    ///
    /// Everything here is the caller's to fix, so it's reported straight back instead of being
    /// recorded as request state.
    pub fn preflight(&self, request: &ProcessingRequest) -> Result<(), DispatchError> {
        if request.identifier.trim().is_empty() {
            return Err(DispatchError::Validation("request <identifier> must not be blank".to_string()));
        }
        request.language()?;
        if request.state != ProcessState::Created {
            return Err(DispatchError::IllegalTransition { from: request.state, to: ProcessState::Processing });
        }
        // the caller's copy may be stale
        let stored = self.find_request(&request.identifier)?;
        if stored.state != ProcessState::Created {
            return Err(DispatchError::IllegalTransition { from: stored.state, to: ProcessState::Processing });
        }
        self.validate_language_template(request)?;

        let source = request.source_path();
        if !source.is_file() {
            return Err(DispatchError::Validation(format!("source file <{}> doesn't exist", source.display())));
        }
        Ok(())
    }

    /// Run one submission from start to finish, blocking
    ///
    /// Marks the request PROCESSING, compiles if the language needs it, renders the launch
    /// script, hands it to the scheduler and persists the outcome. Failures along the way end
    /// up as FINISHED_WITH_ERRORS on the record; an `Err` means the record itself couldn't be
    /// loaded or saved.
    pub fn dispatch(&self, request: &ProcessingRequest, resources: &[ProcessResource]) -> Result<Output, DispatchError> {
        let id = &request.identifier;
        self.locks.with_lock(id, || {
            let mut current = self.find_request(id)?;
            current.transition(ProcessState::Processing)?;
            self.store.save(&current)
        })?;

        let output = self.run(request, resources);

        self.locks.with_lock(id, || {
            let mut current = self.find_request(id)?;
            if current.state != ProcessState::Processing {
                // a poll got there first, its outcome wins
                warn!("Request {} is already {}, dropping dispatch outcome", id, current.state);
                return Ok(());
            }
            current.apply(output.clone())?;
            self.store.save(&current)
        })?;

        Ok(output)
    }

    fn run(&self, request: &ProcessingRequest, resources: &[ProcessResource]) -> Output {
        let language = match request.language() {
            Ok(language) => language,
            Err(err) => return Output::failed(err.to_string()),
        };
        let plan = match plan_request(&self.config, request, resources) {
            Ok(plan) => plan,
            Err(err) => return Output::failed(err.to_string()),
        };

        if let Some(compile) = &plan.compile {
            match execute(&compile.prefix, &compile.argument) {
                Ok(compiled) if compiled.succeeded() => info!("Compiled {} successfully", request.file_name),
                Ok(compiled) => {
                    info!("Compiling {} failed", request.file_name);
                    return Output::failed(compiled.failure_text());
                }
                Err(err) => return Output::failed(err.to_string()),
            }
        }

        match render(&self.config, language, &plan.run.to_string(), &request.base_path) {
            Ok(script) => self.hand_off(&script),
            Err(err) => {
                warn!("Can't render launch script for {}: {}", request.identifier, err);
                Output::failed(err.to_string())
            }
        }
    }

    /// Submit the launch script to the cluster scheduler
    ///
    /// Success only means the scheduler accepted the script. Its stdout (usually the cluster
    /// job id) becomes the result.
    fn hand_off(&self, script: &LaunchScript) -> Output {
        let prefix = format!("{} ", self.config.toolchain.submit);
        let submitted = match execute(&prefix, &script.path.to_string_lossy()) {
            Ok(submitted) => submitted,
            Err(err) => return Output::failed(err.to_string()),
        };

        if !submitted.succeeded() {
            info!("Script {} rejected by the cluster", script.path.display());
            return Output::failed(submitted.failure_text());
        }

        info!("Script {} sent to the cluster: {}", script.path.display(), submitted.stdout.trim());
        match self.config.finish_on_handoff {
            true => Output::ok(submitted.stdout),
            false => Output::processing(submitted.stdout),
        }
    }
}
