use std::io;

use nix::Error as NixError;
use thiserror::Error;

/// Every fallible operation in this crate returns this result alias.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error kinds surfaced across the tracer, region, and match subsystems.
///
/// Variants that wrap a kernel error keep the originating `nix`/`io` error
/// around rather than flattening it to a bare message, so a caller can still
/// inspect `raw_os_error()` if it needs to.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no tracee is attached")]
    NotAttached,

    #[error("invalid tracer state transition: {0}")]
    InvalidState(&'static str),

    #[error("tracee is gone (ESRCH)")]
    TraceeGone,

    #[error("ptrace request failed: {0}")]
    PtraceFailed(#[source] NixError),

    #[error("waitpid failed: {0}")]
    WaitFailed(#[source] NixError),

    #[error("i/o on /proc/<pid>/{{mem,maps}} failed: {0}")]
    IoFailed(#[source] io::Error),

    #[error("needle could not be parsed")]
    InvalidNeedle,

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("match store allocation failed")]
    OutOfMemory,
}

impl EngineError {
    /// Maps a `nix::Error` from a ptrace call, classifying ESRCH as
    /// [`EngineError::TraceeGone`] per the tracer's failure policy.
    pub fn from_ptrace(err: NixError) -> EngineError {
        if err == NixError::Sys(nix::errno::Errno::ESRCH) {
            EngineError::TraceeGone
        } else {
            EngineError::PtraceFailed(err)
        }
    }

    pub fn from_wait(err: NixError) -> EngineError {
        if err == NixError::Sys(nix::errno::Errno::ESRCH) {
            EngineError::TraceeGone
        } else {
            EngineError::WaitFailed(err)
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> EngineError {
        EngineError::IoFailed(err)
    }
}

impl From<NixError> for EngineError {
    fn from(err: NixError) -> EngineError {
        EngineError::from_ptrace(err)
    }
}
