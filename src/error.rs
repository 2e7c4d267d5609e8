//! Rich diagnostic error types for the bridge.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! which side of the boundary failed and what to change.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the bridge.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Learner(#[from] LearnerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Native errors
// ---------------------------------------------------------------------------

/// A failure reported by the native engine.
///
/// The message is opaque: the bridge compares it against a single well-known
/// value and otherwise passes it through untouched. `Display` prints the
/// message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(vw_bridge::native::failure))]
pub struct NativeError {
    message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message exactly as the native engine reported it.
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// Initialization errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InitError {
    #[error("native initialize failed: {source}")]
    #[diagnostic(
        code(vw_bridge::init::rejected),
        help(
            "The native engine refused the configuration string. \
             Check the option names and values against the engine's argument grammar, \
             and that any -i/-f model paths exist and are readable."
        )
    )]
    Rejected {
        #[source]
        source: NativeError,
    },

    #[error("configuration string contains an interior NUL byte at offset {offset}")]
    #[diagnostic(
        code(vw_bridge::init::invalid_args),
        help("Configuration strings cross a C boundary and cannot contain NUL bytes.")
    )]
    InvalidArgs { offset: usize },
}

impl InitError {
    /// The native message behind a rejection, if this error came from the engine.
    pub fn native_message(&self) -> Option<&str> {
        match self {
            InitError::Rejected { source } => Some(source.message()),
            InitError::InvalidArgs { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Learner (per-call) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LearnerError {
    /// The display text is stable; callers may match on it.
    #[error("Already closed.")]
    #[diagnostic(
        code(vw_bridge::learner::already_closed),
        help("The native instance was released by close(). Open a new Learner to continue.")
    )]
    AlreadyClosed,

    #[error("sample contains an interior NUL byte at offset {offset}")]
    #[diagnostic(
        code(vw_bridge::learner::invalid_sample),
        help("Samples cross a C boundary and cannot contain NUL bytes.")
    )]
    InvalidSample { offset: usize },

    #[error("native run failed: {source}")]
    #[diagnostic(
        code(vw_bridge::learner::native),
        help("The native engine could not process this sample. Check its format.")
    )]
    Native {
        #[source]
        source: NativeError,
    },
}

// ---------------------------------------------------------------------------
// Library loading errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("no native library path given and {var} is not set")]
    #[diagnostic(
        code(vw_bridge::load::no_path),
        help("Pass the shim path explicitly or export {var}=/path/to/libvw_bridge.so.")
    )]
    NoPath { var: &'static str },

    #[error("failed to load native library {path}: {message}")]
    #[diagnostic(
        code(vw_bridge::load::open),
        help(
            "Check that the file exists, matches this platform and architecture, \
             and that its own dependencies are on the loader path."
        )
    )]
    Open { path: String, message: String },

    #[error("native library {path} does not export `{symbol}`: {message}")]
    #[diagnostic(
        code(vw_bridge::load::symbol),
        help("The shim must export the full vw_bridge_* C ABI. Rebuild it against this version.")
    )]
    MissingSymbol {
        path: String,
        symbol: &'static str,
        message: String,
    },

    #[error("native library already loaded from {loaded}, refusing to load {requested}")]
    #[diagnostic(
        code(vw_bridge::load::conflict),
        help("The native library is loaded once per process. Use the same path everywhere.")
    )]
    AlreadyLoaded { loaded: String, requested: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read learner config: {path}")]
    #[diagnostic(
        code(vw_bridge::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write learner config: {path}")]
    #[diagnostic(
        code(vw_bridge::config::write),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse learner config {path}: {message}")]
    #[diagnostic(
        code(vw_bridge::config::parse),
        help("The config must be TOML with the fields of LearnerConfig.")
    )]
    Parse { path: String, message: String },
}

/// Result type for native primitive calls.
pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Result type for learner construction.
pub type InitResult<T> = std::result::Result<T, InitError>;

/// Result type for predict/learn calls.
pub type LearnerResult<T> = std::result::Result<T, LearnerError>;

/// Result type for native library loading.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Result type for configuration I/O.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias for functions returning bridge results.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
