//! Error types for roleenv-config.

use std::path::PathBuf;

/// Result type alias for roleenv-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or watching deployment configuration.
///
/// Every variant is local to one reload attempt: reload failures are logged
/// and the previously published snapshot stays authoritative. Nothing here is
/// ever surfaced to a consumer callback.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The monitored directory could not be listed (including: it does not
    /// exist). Recoverable: watching continues and the next change event
    /// retries the full scan.
    #[error("failed to read configuration directory {dir}: {source}")]
    DirectoryRead {
        /// The monitored directory
        dir: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// No marker-matching deployment configuration file was found.
    #[error("no deployment configuration file found in {dir}")]
    NoCandidateFile {
        /// The monitored directory
        dir: PathBuf,
    },

    /// The selected configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// The file that failed to read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A candidate file's metadata could not be obtained. Per-file and
    /// non-fatal: the file is logged and excluded from selection.
    #[error("failed to stat {path}: {source}")]
    Stat {
        /// The file that failed to stat
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The selected file is not well-formed XML.
    #[error("failed to parse {path}: {source}")]
    XmlParse {
        /// The file that failed to parse
        path: PathBuf,
        /// Underlying parser error
        #[source]
        source: roxmltree::Error,
    },

    /// The document parsed but does not match the expected provisioning
    /// schema.
    #[error("invalid deployment configuration: {0}")]
    Schema(#[from] SchemaError),

    /// The watch resource could not be created or attached.
    #[error("file watching error: {0}")]
    Watch(String),
}

/// Schema violations found while transforming a parsed document into a
/// snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A required element is missing from the document.
    #[error("missing element '{0}'")]
    MissingElement(&'static str),

    /// A required attribute is missing from an element.
    #[error("element '{element}' is missing attribute '{attribute}'")]
    MissingAttribute {
        /// The element that was inspected
        element: String,
        /// The attribute that was expected
        attribute: &'static str,
    },

    /// An endpoint address did not split into a non-empty host and port.
    #[error("endpoint '{endpoint}' has malformed address '{address}', expected host:port")]
    MalformedAddress {
        /// The endpoint's `name` attribute
        endpoint: String,
        /// The offending `address` attribute value
        address: String,
    },
}
