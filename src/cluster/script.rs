use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::config::Config;
use crate::error::DispatchError;
use crate::language::Language;
use crate::request::processing::ProcessingRequest;

/// Every language folder has one of these
pub static TEMPLATE_NAME: &str = "template.txt";
/// Replaced with the run command when a launch script is rendered
pub static KEY_TO_REPLACE: &str = "%COMMAND%";
/// Written to the job directory and handed to the scheduler
pub static SCRIPT_NAME: &str = "qsub.sh";

/// A LaunchScript is the path to a rendered script that's submitted to the cluster scheduler
///
/// The scheduler runs the script with the job directory as its working directory, and is
/// expected to leave a sentinel file (`prueba.out` or `prueba.err`) next to it once the job ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchScript {
    pub path: PathBuf,
}

/// Check the template for the request's language exists before anything is queued
pub fn validate_language_template(config: &Config, request: &ProcessingRequest) -> Result<PathBuf, DispatchError> {
    let language = request.language()?;
    let path = config.template_folder(language).join(TEMPLATE_NAME);
    if !path.is_file() {
        warn!("Template {} is missing", path.display());
        return Err(DispatchError::Validation(format!(
            "template <{}> doesn't exist on the server, ask an administrator to configure it",
            path.display())));
    }
    Ok(path)
}

/// Substitute the first placeholder with `command`, verbatim
///
/// Only one substitution happens, so a command that itself contains the placeholder text comes
/// out unchanged.
pub fn render_template(template: &str, command: &str) -> Result<String, DispatchError> {
    if !template.contains(KEY_TO_REPLACE) {
        return Err(DispatchError::Validation(format!("template has no {KEY_TO_REPLACE} placeholder")));
    }
    Ok(template.replacen(KEY_TO_REPLACE, command, 1))
}

/// Read the language template, render it with `command` and write it to the job directory
pub fn render(config: &Config, language: Language, command: &str, base_path: &str) -> Result<LaunchScript, DispatchError> {
    let template_path = config.template_folder(language).join(TEMPLATE_NAME);
    info!("Rendering {} with command <{}>", template_path.display(), command);

    let template = fs::read_to_string(&template_path).map_err(|err| {
        warn!("Can't read template {}: {}", template_path.display(), err);
        DispatchError::Validation(format!("template <{}> can't be read: {err}", template_path.display()))
    })?;
    let content = render_template(&template, command)?;

    let path = PathBuf::from(base_path).join(SCRIPT_NAME);
    fs::write(&path, content)?;
    info!("Launch script written to {}", path.display());

    Ok(LaunchScript { path })
}
