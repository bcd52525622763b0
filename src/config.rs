//! Runtime configuration shared by the dispatch engine
//!
//! Built from command line options in `main`, or directly in tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::language::Language;

/// Programs used to build, run and submit jobs
///
/// Each is the first word of a command line. The request-specific argument is appended after a
/// single space.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub python: String,
    pub rscript: String,
    pub javac: String,
    pub java: String,
    /// Cluster scheduler submission command, e.g. `qsub`
    pub submit: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            python: "python".to_string(),
            rscript: "Rscript".to_string(),
            javac: "javac".to_string(),
            java: "java".to_string(),
            submit: "qsub".to_string(),
        }
    }
}

/// Delay a worker waits before starting on a submission
///
/// Models the admission throttling of the shared cluster. The worker is busy for the whole
/// delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
}

impl Backoff {
    pub fn delay(&self) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(duration) => *duration,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(Duration::from_secs(20))
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    /// Submissions waiting for a free worker, beyond this they are rejected
    pub queue_depth: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig { workers: 2, queue_depth: 10 }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Contains one directory per language, each with a `template.txt`
    pub template_dir: PathBuf,
    /// Contains one directory per language with auxiliary compile resources
    pub resource_dir: PathBuf,
    pub toolchain: Toolchain,
    pub backoff: Backoff,
    pub pool: PoolConfig,
    /// Record FINISHED_OK as soon as the scheduler accepts a script instead of waiting for the
    /// success sentinel
    pub finish_on_handoff: bool,
}

impl Config {
    pub fn new(template_dir: &Path, resource_dir: &Path) -> Config {
        Config {
            template_dir: template_dir.to_path_buf(),
            resource_dir: resource_dir.to_path_buf(),
            toolchain: Toolchain::default(),
            backoff: Backoff::default(),
            pool: PoolConfig::default(),
            finish_on_handoff: false,
        }
    }

    pub fn template_folder(&self, language: Language) -> PathBuf {
        self.template_dir.join(language.to_string())
    }

    /// Prefix for resource names, always ends with a path separator
    pub fn resource_folder(&self, language: Language) -> String {
        let root = self.resource_dir.to_string_lossy();
        format!("{}/{}/", root.trim_end_matches('/'), language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folders_are_per_language() {
        let config = Config::new(Path::new("/templates"), Path::new("/res/"));
        assert_eq!(config.template_folder(Language::Python), PathBuf::from("/templates/python"));
        assert_eq!(config.resource_folder(Language::Java), "/res/java/");
    }

    #[test]
    fn reference_sizing() {
        let config = Config::new(Path::new("t"), Path::new("r"));
        assert_eq!(config.pool, PoolConfig { workers: 2, queue_depth: 10 });
        assert_eq!(config.backoff.delay(), Duration::from_secs(20));
        assert_eq!(Backoff::None.delay(), Duration::ZERO);
    }
}
