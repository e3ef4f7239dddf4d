//! Pipeline target modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which variant of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// The full pipeline, compression included.
    #[default]
    Build,
    /// Every stage except the build-only ones, for faster iteration.
    Dev,
}

impl BuildMode {
    /// Returns true if a stage with the given `build_only` flag runs in this mode.
    #[must_use]
    pub fn includes(&self, build_only: bool) -> bool {
        match self {
            Self::Build => true,
            Self::Dev => !build_only,
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Dev => write!(f, "dev"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(Self::Build),
            "dev" => Ok(Self::Dev),
            other => Err(format!("unknown mode '{other}' (expected 'build' or 'dev')")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_excludes_build_only() {
        assert!(BuildMode::Build.includes(true));
        assert!(BuildMode::Build.includes(false));
        assert!(!BuildMode::Dev.includes(true));
        assert!(BuildMode::Dev.includes(false));
    }

    #[test]
    fn test_parse() {
        assert_eq!("dev".parse::<BuildMode>(), Ok(BuildMode::Dev));
        assert_eq!("build".parse::<BuildMode>(), Ok(BuildMode::Build));
        assert!("release".parse::<BuildMode>().is_err());
    }
}
