use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Source languages the cluster knows how to build and run
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    R
}

impl Language {
    /// Only Java needs a compile step before the launch script is rendered
    pub fn is_compiled(&self) -> bool {
        matches!(self, Language::Java)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Language::Java => write!(f, "java"),
            Language::Python => write!(f, "python"),
            Language::R => write!(f, "r")
        }
    }
}

/// Request records keep the language as free text, so parsing is where an unsupported language
/// stops being silent
impl FromStr for Language {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "python" => Ok(Language::Python),
            "r" => Ok(Language::R),
            _ => Err(DispatchError::UnsupportedLanguage(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Java".parse::<Language>().unwrap(), Language::Java);
        assert_eq!("PYTHON".parse::<Language>().unwrap(), Language::Python);
        assert_eq!(" r ".parse::<Language>().unwrap(), Language::R);
    }

    #[test]
    fn unknown_language_is_an_error() {
        let err = "fortran".parse::<Language>().unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedLanguage(ref name) if name == "fortran"));
    }

    #[test]
    fn display_matches_folder_names() {
        assert_eq!(Language::Java.to_string(), "java");
        assert_eq!(Language::R.to_string(), "r");
    }
}
