use std::fmt;

use crate::config::{Config, Toolchain};
use crate::error::DispatchError;
use crate::language::Language;
use crate::request::processing::{ProcessResource, ProcessingRequest};

/// A command line split the way the process invoker takes it: a fixed prefix ending in a space,
/// and the request-specific argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub prefix: String,
    pub argument: String,
}

impl CommandLine {
    fn new(program: &str, argument: String) -> CommandLine {
        CommandLine { prefix: format!("{program} "), argument }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.argument)
    }
}

/// What has to happen on the submit host for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Run synchronously before the script is rendered, interpreted languages have none
    pub compile: Option<CommandLine>,
    /// Goes into the launch script
    pub run: CommandLine,
}

/// Pick commands for a request, using the configured toolchain and resource folder
pub fn plan_request(config: &Config, request: &ProcessingRequest, resources: &[ProcessResource])
    -> Result<LaunchPlan, DispatchError> {
    let language = request.language()?;
    Ok(plan(language, &config.toolchain, request, resources, &config.resource_folder(language)))
}

/// Build compile and run commands. Pure: the same inputs always give the same plan.
///
/// Paths are concatenated, not joined, so the request's base path is expected to end with a
/// separator. Resource paths are concatenated with nothing in between, in list order.
pub fn plan(language: Language, toolchain: &Toolchain, request: &ProcessingRequest,
            resources: &[ProcessResource], resource_folder: &str) -> LaunchPlan {
    let file_path = format!("{}{}", request.base_path, request.file_name);
    let resource_paths = join_resource_paths(resources, resource_folder);

    let compile = language.is_compiled().then(|| match resources.is_empty() {
        true => CommandLine::new(&toolchain.javac, file_path.clone()),
        false => CommandLine::new(&format!("{} -cp", toolchain.javac), format!("{resource_paths} {file_path}")),
    });

    let run = match language {
        Language::Python => CommandLine::new(&toolchain.python, file_path),
        Language::R => CommandLine::new(&toolchain.rscript, file_path),
        Language::Java => {
            let java = format!("{} -cp", toolchain.java);
            let base_path = &request.base_path;
            let class_name = request.file_base_name();
            match resources.is_empty() {
                true => CommandLine::new(&java, format!("{base_path}/. {class_name}")),
                false => CommandLine::new(&java, format!("{resource_paths}/{base_path} {class_name}")),
            }
        }
    };

    LaunchPlan { compile, run }
}

fn join_resource_paths(resources: &[ProcessResource], resource_folder: &str) -> String {
    resources.iter()
        .map(|resource| format!("{resource_folder}{}", resource.name))
        .collect()
}
