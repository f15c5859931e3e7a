//! Self-update: version checks, the user-driven update flow, and the default
//! HTTP transport.

pub mod check;
pub mod client;
pub mod flow;
pub mod http;
pub mod install;

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use check::{UpdateCheck, check_for_updates, check_for_updates_now};
pub use client::{UpdateClient, UpdateService};
pub use flow::{UpdateOutcome, UpdatePrompt, UpdateState};

/// Identifier of a build, compared as a semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionString(String);

impl VersionString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as semver, accepting an optional leading `v`.
    pub fn to_semver(&self) -> Result<semver::Version, UpdateError> {
        let trimmed = self.0.trim();
        semver::Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).map_err(|source| {
            UpdateError::Version {
                value: self.0.clone(),
                source,
            }
        })
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A newer release offered by the update manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub version: VersionString,
    pub release_notes: Option<String>,
    /// Where the client fetches the artifact from.
    pub download_ref: String,
}

/// A downloaded update payload, valid until it is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateArtifact {
    pub version: VersionString,
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to start update runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("update request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid version {value:?}: {source}")]
    Version {
        value: String,
        #[source]
        source: semver::Error,
    },
    #[error("unable to resolve user cache directory")]
    NoCacheDir,
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read update archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("update bundle is missing {0}")]
    MissingBinary(String),
}

impl UpdateError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("3.0.6", "3.0.6")]
    #[case("v3.1.0", "3.1.0")]
    #[case(" 4.0.0-beta.1 ", "4.0.0-beta.1")]
    fn versions_parse_with_optional_prefix(#[case] raw: &str, #[case] expected: &str) {
        let parsed = VersionString::new(raw).to_semver().unwrap();

        assert_eq!(parsed.to_string(), expected);
    }

    #[test]
    fn garbage_version_is_reported() {
        let err = VersionString::new("latest").to_semver().unwrap_err();

        assert!(matches!(err, UpdateError::Version { .. }));
        assert!(err.to_string().contains("\"latest\""));
    }
}
