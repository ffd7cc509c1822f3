//! Error types for promoter-core

use thiserror::Error;

/// Result type alias using promoter-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the promoter
///
/// Consistency errors (`DuplicateTag`, `ConflictingOperations`) and
/// configuration errors (`InvalidThreads`, `InvalidConfig`, ...) are fatal and
/// are always raised before any promotion request is executed.
#[derive(Error, Debug)]
pub enum Error {
    /// The same tag is claimed by two different digests of one image
    #[error("Tag {image}:{tag} is claimed by two digests ({first} and {second})")]
    DuplicateTag {
        image: String,
        tag: String,
        first: String,
        second: String,
    },

    /// More than one kind of tag operation targets the same tag in one run
    #[error("Conflicting operations for {image}:{tag}: {first} and {second}")]
    ConflictingOperations {
        image: String,
        tag: String,
        first: String,
        second: String,
    },

    /// Worker pool width is out of range
    #[error("Invalid thread count: {threads} (must be at least 1)")]
    InvalidThreads { threads: usize },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// Registry missing from the inventory snapshot
    #[error("Registry not present in inventory: {name}")]
    UnknownRegistry { name: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a duplicate tag error
    pub fn duplicate_tag(
        image: impl Into<String>,
        tag: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::DuplicateTag {
            image: image.into(),
            tag: tag.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a conflicting operations error
    pub fn conflicting_operations(
        image: impl Into<String>,
        tag: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::ConflictingOperations {
            image: image.into(),
            tag: tag.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unknown registry error
    pub fn unknown_registry(name: impl Into<String>) -> Self {
        Self::UnknownRegistry { name: name.into() }
    }

    /// Whether this error stems from a malformed manifest or inventory
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTag { .. } | Self::ConflictingOperations { .. }
        )
    }
}
