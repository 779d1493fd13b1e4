//! Semantic version parsing
//!
//! Versions follow https://semver.org/: `major` for breaking changes,
//! `minor` for backwards-compatible additions, `patch` for backwards-
//! compatible fixes. Missing components default to zero, so `"1"` and
//! `"1.0.0"` compare equal.

use crate::errors::{DasError, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed `major.minor.patch` version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SemanticVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The version as a `(major, minor, patch)` tuple for ordering tricks
    pub fn as_tuple(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = DasError;

    fn from_str(value: &str) -> Result<Self> {
        let mut components = value.trim().split('.');

        let mut next_component = |name: &str| -> Result<u32> {
            match components.next() {
                None => Ok(0),
                Some(raw) => raw.parse().map_err(|_| DasError::ParseError {
                    message: format!("Invalid {} component in version '{}'", name, value),
                }),
            }
        };

        let major = next_component("major")?;
        let minor = next_component("minor")?;
        let patch = next_component("patch")?;

        if components.next().is_some() {
            return Err(DasError::ParseError {
                message: format!("Version '{}' has more than three components", value),
            });
        }

        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
