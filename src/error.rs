// src/error.rs
// Error taxonomy for the host. Every variant here is fatal for the session;
// recoverable conditions (watch subscription failure) are handled in place
// with a fallback and never become an error value.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or decoding the framed browser request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("request truncated while reading {0}")]
    Truncated(&'static str),

    #[error("request frame of {0} bytes exceeds the frame size limit")]
    OversizedFrame(u32),

    #[error("malformed request JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request is missing the required 'text' field")]
    MissingText,

    #[error("failed to read request")]
    Io(#[from] std::io::Error),
}

/// The requested editor and every fallback candidate are missing.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("editor not found: {0}")]
    NotFound(String),
}

/// Scratch file creation or initial write failed.
#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("could not create a unique scratch file after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("scratch file I/O failed")]
    Io(#[from] std::io::Error),
}

/// Fatal conditions raised by the session orchestrator.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Scratch(#[from] ScratchError),

    #[error("failed to launch editor '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for the editor process")]
    Wait(#[source] std::io::Error),

    /// The editor deleted the scratch file instead of replacing it.
    /// Reported distinctly from a plain read failure.
    #[error("scratch file {} vanished before the editor exited", path.display())]
    FileMissingAfterExit { path: PathBuf },

    #[error("failed to read scratch file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write response to the browser")]
    Respond(#[source] std::io::Error),
}
