//! Error types for rule sets.
//!
//! Errors are layered the same way the sets are built: a [`RuleError`] is one
//! bad pattern, a [`FileError`] is a rule file that could not be read or
//! parsed, [`LoadError`] adds the positional context of the loader, and
//! [`SetError`] is what construction of a whole set reports.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A single rule that could not be added to a matcher.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("empty pattern")]
    Empty,

    #[error("unknown match type {0:?}")]
    UnknownType(String),

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("invalid ip or cidr {0:?}")]
    InvalidIp(String),
}

/// A rule file that could not be loaded.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid rule at line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: RuleError,
    },
}

/// Inline expressions and local files, with the index and literal that failed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load expression #{index} {expr}: {source}")]
    Expression {
        index: usize,
        expr: String,
        #[source]
        source: RuleError,
    },

    #[error("failed to load file #{index} {path}: {source}")]
    File {
        index: usize,
        path: String,
        #[source]
        source: FileError,
    },
}

/// Failure of a single download.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to download file: {0}")]
    Request(#[from] reqwest::Error),

    #[error("bad status: {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to write file: {0}")]
    Write(#[from] io::Error),
}

/// Provisioning failure of one remote source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to create directory {}: {source}", .dir.display())]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("failed to update remote file: {0}")]
    Update(#[source] DownloadError),

    #[error("failed to load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: FileError,
    },
}

/// A referenced provider that cannot be used.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("plugin {tag} not found")]
    NotFound { tag: String },

    #[error("{tag} is not a {capability}")]
    MissingCapability {
        tag: String,
        capability: &'static str,
    },
}

/// Construction failure of a domain or IP set.
#[derive(Debug, Error)]
pub enum SetError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid remote file url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to load remote file {url}: {source}")]
    Remote {
        url: String,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("duplicate plugin tag {0}")]
    DuplicateTag(String),
}

impl SetError {
    /// Configuration errors need a config change; everything else may succeed
    /// on a later start (network, disk).
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        !matches!(self, Self::Remote { .. })
    }
}
