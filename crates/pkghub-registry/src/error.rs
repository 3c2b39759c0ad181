//! Error types for the registry crate.
//!
//! [`RegistryError`] covers every failure of the ingestion, version
//! resolution and archive extraction pipeline. [`RegistryError::kind`]
//! classifies each variant so callers can react to a category of failure
//! without matching every variant.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreachable host or non-2xx response.
    Network,
    /// Bytes that could not be parsed: JSON, zip, YAML or text encoding.
    Format,
    /// Well-formed data that violates the domain model.
    Validation,
    /// A required archive entry is absent.
    MissingEntry,
    /// Runtime failure unrelated to the data, such as a panicked worker.
    Internal,
}

/// Errors that can occur during registry operations.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Failed to fetch {url}: {reason}")]
    #[diagnostic(
        code(pkghub_registry::fetch_remote),
        help("Check your network connection and the URL")
    )]
    FailedToFetchRemote { url: String, reason: String },

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(pkghub_registry::http_status))]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed JSON: {0}")]
    #[diagnostic(
        code(pkghub_registry::json),
        help("The index document may be corrupted or truncated")
    )]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid package index: {0}")]
    #[diagnostic(code(pkghub_registry::invalid_index))]
    InvalidIndex(String),

    #[error("Invalid package: {0}")]
    #[diagnostic(code(pkghub_registry::invalid_package))]
    InvalidPackage(String),

    #[error("Invalid version `{0}`, expected MAJOR.MINOR.PATCH")]
    #[diagnostic(code(pkghub_registry::invalid_version))]
    InvalidVersion(String),

    #[error("Cannot order an empty package list")]
    #[diagnostic(code(pkghub_registry::empty_package_list))]
    EmptyPackageList,

    #[error("Package `{found}` does not belong to group `{expected}`")]
    #[diagnostic(code(pkghub_registry::mixed_package_names))]
    MixedPackageNames { expected: String, found: String },

    #[error("Invalid archive {url}: {source}")]
    #[diagnostic(
        code(pkghub_registry::invalid_archive),
        help("The archive_url must point to a zip file")
    )]
    InvalidArchive {
        url: String,
        source: zip::result::ZipError,
    },

    #[error("Archive entry {name} is not valid UTF-8 text")]
    #[diagnostic(code(pkghub_registry::entry_encoding))]
    EntryEncoding { name: String },

    #[error("Archive entry {name} is larger than {limit} bytes")]
    #[diagnostic(code(pkghub_registry::entry_too_large))]
    EntryTooLarge { name: String, limit: u64 },

    #[error("Missing {0}")]
    #[diagnostic(
        code(pkghub_registry::missing_entry),
        help("Every package archive must contain _manifest.yml, README.md and package.yml")
    )]
    MissingEntry(String),

    #[error("Malformed manifest YAML in {package}: {source}")]
    #[diagnostic(code(pkghub_registry::manifest_syntax))]
    ManifestSyntax {
        package: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid manifest in {package}: {source}")]
    #[diagnostic(
        code(pkghub_registry::manifest_schema),
        help("_manifest.yml needs author, description, name, title, version and a non-empty tags list")
    )]
    ManifestSchema {
        package: String,
        source: serde_yaml::Error,
    },

    #[error("Unsupported asset reference: {0}")]
    #[diagnostic(
        code(pkghub_registry::invalid_asset),
        help("Assets must be GitHub URLs or paths relative to a GitHub repository")
    )]
    InvalidAsset(String),

    #[error(transparent)]
    #[diagnostic(code(pkghub_registry::shared))]
    Shared(Arc<RegistryError>),

    #[error("{0}")]
    #[diagnostic(code(pkghub_registry::custom))]
    Custom(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FailedToFetchRemote { .. } | Self::HttpStatus { .. } => ErrorKind::Network,
            Self::JsonError(_)
            | Self::InvalidArchive { .. }
            | Self::EntryEncoding { .. }
            | Self::EntryTooLarge { .. }
            | Self::ManifestSyntax { .. } => ErrorKind::Format,
            Self::InvalidIndex(_)
            | Self::InvalidPackage(_)
            | Self::InvalidVersion(_)
            | Self::EmptyPackageList
            | Self::MixedPackageNames { .. }
            | Self::ManifestSchema { .. }
            | Self::InvalidAsset(_) => ErrorKind::Validation,
            Self::MissingEntry(_) => ErrorKind::MissingEntry,
            Self::Shared(inner) => inner.kind(),
            Self::Custom(_) => ErrorKind::Internal,
        }
    }
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
