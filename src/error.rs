//! Error types for recflow.

use std::io;

use thiserror::Error;

/// Errors that can occur while configuring or running a record stream.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input file could not be opened.
    #[error("open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Reading from an input failed after it was opened.
    #[error("read {filename}: {source}")]
    Read {
        filename: String,
        #[source]
        source: io::Error,
    },

    /// Malformed structural input, e.g. a CSV row with the wrong field count.
    #[error("{filename}:{line}: {message}")]
    Parse {
        filename: String,
        line: u64,
        message: String,
    },

    /// A worker thread could not be started.
    #[error("spawn {name}: {source}")]
    Thread {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Writing the output stream failed.
    #[error("write: {0}")]
    Write(#[source] io::Error),

    /// An error-valued field seen while running with `--fail-on-data-error`.
    #[error("data error at NR={nr} FNR={fnr} FILENAME={filename}: field \"{field}\" is {text}")]
    Data {
        nr: u64,
        fnr: u64,
        filename: String,
        field: String,
        text: String,
    },

    /// A verb rejected its arguments.
    #[error("{verb}: {message}")]
    Verb { verb: String, message: String },

    /// The verb name is not registered.
    #[error("verb \"{0}\" not found")]
    UnknownVerb(String),

    /// A `put`/`filter` expression failed to parse.
    #[error("parse error at {line}:{column}: {message}")]
    Script {
        line: usize,
        column: usize,
        message: String,
    },

    /// Invalid main-option usage.
    #[error("{0}")]
    Usage(String),

    /// `-h`/`--help` was given to a verb; usage has already been printed.
    #[error("help requested")]
    HelpRequested,

    /// The sink stopped without reaching end of stream and no other signal
    /// explains why.
    #[error("stream ended before the output was complete")]
    Incomplete,
}

impl PipelineError {
    /// Convenience constructor for verb argument errors.
    pub fn verb(verb: &str, message: impl Into<String>) -> Self {
        PipelineError::Verb {
            verb: verb.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
