//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the code search core.
///
/// Each variant corresponds to one of the error kinds components are
/// permitted to raise; the dispatcher maps these onto the `(kind, message)`
/// pair reported to callers via [`Error::kind`].
#[derive(Error, Debug)]
pub enum Error {
    /// A project path does not exist, is not a directory, or escapes the
    /// configured project roots.
    #[error("invalid project path: {path}")]
    InvalidProjectPath {
        /// The offending path, as supplied by the caller.
        path: String,
    },

    /// A request named a project id that is not present in the registry.
    #[error("project not found: {project}")]
    ProjectNotFound {
        /// The unknown project identifier.
        project: String,
    },

    /// A file could not be read during indexing. Indexing recovers from
    /// this by skipping the file; it is only surfaced as an error when a
    /// caller asks for that single file directly.
    #[error("failed to read file {path}: {source}")]
    FileReadFailed {
        /// The file that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The embedding provider failed to embed a chunk of text.
    #[error("embedding failed: {message}")]
    EmbeddingFailed {
        /// Description of the failure, as reported by the provider.
        message: String,
    },

    /// A cache entry on disk failed to parse or its vector length did not
    /// match the declared dimensions. Treated as a cache miss by callers.
    #[error("embedding cache entry corrupt at {path}: {reason}")]
    CacheReadCorrupt {
        /// Path of the corrupt cache file.
        path: String,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// An embedding cache entry could not be written to disk.
    #[error("failed to write embedding cache entry {path}: {source}")]
    CacheWriteFailed {
        /// Path of the cache file that failed to write.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The `swift package dump-package` subprocess (or another declared
    /// manifest tool) is not installed or not on `PATH`.
    #[error("subprocess unavailable: {command}")]
    SubprocessUnavailable {
        /// The command that could not be located.
        command: String,
    },

    /// A manifest-parsing subprocess ran but exited non-zero or produced
    /// output that could not be parsed.
    #[error("subprocess failed: {command}: {message}")]
    SubprocessFailed {
        /// The command that failed.
        command: String,
        /// Description of the failure.
        message: String,
    },

    /// A caller-supplied argument was out of range or otherwise malformed
    /// (e.g. a negative limit, an empty query).
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// Description of the invalid argument.
        message: String,
    },

    /// Configuration failed to load or did not pass validation.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// A failure that does not fit another category and indicates a bug
    /// or an unrecoverable environment problem.
    #[error("internal error: {message}")]
    InternalError {
        /// Description of the internal failure.
        message: String,
    },

    /// I/O error not already covered by a more specific variant.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// JSON (de)serialization error not already covered by a more specific
    /// variant.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// UTF-8 decoding error, e.g. reading a source file with invalid
    /// encoding.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Stable machine-readable category for an [`Error`], used by the request
/// dispatcher to report failures without leaking internal error shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`Error::InvalidProjectPath`].
    InvalidProjectPath,
    /// See [`Error::ProjectNotFound`].
    ProjectNotFound,
    /// See [`Error::FileReadFailed`].
    FileReadFailed,
    /// See [`Error::EmbeddingFailed`].
    EmbeddingFailed,
    /// See [`Error::CacheReadCorrupt`].
    CacheReadCorrupt,
    /// See [`Error::CacheWriteFailed`].
    CacheWriteFailed,
    /// See [`Error::SubprocessUnavailable`].
    SubprocessUnavailable,
    /// See [`Error::SubprocessFailed`].
    SubprocessFailed,
    /// See [`Error::InvalidArguments`].
    InvalidArguments,
    /// See [`Error::Config`].
    Config,
    /// See [`Error::InternalError`] and any uncategorized boundary error.
    InternalError,
}

impl Error {
    /// Classify this error into the stable kind reported to callers,
    /// alongside the display message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidProjectPath { .. } => ErrorKind::InvalidProjectPath,
            Error::ProjectNotFound { .. } => ErrorKind::ProjectNotFound,
            Error::FileReadFailed { .. } => ErrorKind::FileReadFailed,
            Error::EmbeddingFailed { .. } => ErrorKind::EmbeddingFailed,
            Error::CacheReadCorrupt { .. } => ErrorKind::CacheReadCorrupt,
            Error::CacheWriteFailed { .. } => ErrorKind::CacheWriteFailed,
            Error::SubprocessUnavailable { .. } => ErrorKind::SubprocessUnavailable,
            Error::SubprocessFailed { .. } => ErrorKind::SubprocessFailed,
            Error::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Error::Config { .. } => ErrorKind::Config,
            Error::InternalError { .. }
            | Error::Io { .. }
            | Error::Json { .. }
            | Error::Utf8(_) => ErrorKind::InternalError,
        }
    }

    /// Construct an [`Error::InvalidProjectPath`].
    pub fn invalid_project_path<S: Into<String>>(path: S) -> Self {
        Self::InvalidProjectPath { path: path.into() }
    }

    /// Construct an [`Error::ProjectNotFound`].
    pub fn project_not_found<S: Into<String>>(project: S) -> Self {
        Self::ProjectNotFound {
            project: project.into(),
        }
    }

    /// Construct an [`Error::EmbeddingFailed`].
    pub fn embedding_failed<S: Into<String>>(message: S) -> Self {
        Self::EmbeddingFailed {
            message: message.into(),
        }
    }

    /// Construct an [`Error::InvalidArguments`].
    pub fn invalid_arguments<S: Into<String>>(message: S) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Construct an [`Error::Config`].
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Construct an [`Error::InternalError`].
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

impl From<nix::errno::Errno> for Error {
    fn from(err: nix::errno::Errno) -> Self {
        Self::InternalError {
            message: format!("fsync failed: {err}"),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_each_variant_to_a_stable_category() {
        let err = Error::project_not_found("demo");
        assert_eq!(err.kind(), ErrorKind::ProjectNotFound);

        let err = Error::invalid_arguments("limit must be positive");
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);

        let err: Error = std::io::Error::other("boom").into();
        assert_eq!(err.kind(), ErrorKind::InternalError);
    }

    #[test]
    fn config_error_conversion_preserves_message() {
        let source = config::ConfigError::Message("bad toml".into());
        let err: Error = source.into();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("bad toml"));
    }
}
