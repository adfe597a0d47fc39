//! Error types surfaced to the user as `error: <message>` lines.
//!
//! OS failures carry the raw [`Errno`] and render as the bare `strerror`
//! text, e.g. `No such file or directory`.

use nix::errno::Errno;
use std::collections::TryReserveError;
use std::fmt::Display;
use std::io::{self, Write};
use thiserror::Error;

/// Argument and OS failures of the `cd` and `exit` built-ins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuiltinError {
    #[error("must have one argument")]
    MissingArgument,

    #[error("too many arguments")]
    TooManyArguments,

    #[error("expecting 0 arguments(or any other valid expression)")]
    UnexpectedArguments,

    #[error("{}", .0.desc())]
    Os(#[from] Errno),
}

/// Failures while reading one line of input. The offending line is discarded.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("{}", .0.desc())]
    Read(Errno),

    #[error("{0}")]
    Io(io::Error),

    #[error("cannot grow input buffer to {requested} bytes")]
    Grow {
        requested: usize,
        #[source]
        source: TryReserveError,
    },
}

impl From<io::Error> for LineError {
    fn from(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) => LineError::Read(Errno::from_raw(code)),
            None => LineError::Io(err),
        }
    }
}

/// Failures of the process launcher, all observed in the parent.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("child stack size must be non-zero")]
    EmptyStack,

    #[error("{}", .0.desc())]
    StackAlloc(Errno),

    #[error("{}", .0.desc())]
    Spawn(Errno),

    #[error("{}", .0.desc())]
    Wait(Errno),

    #[error("{}", Errno::ENOENT.desc())]
    NotFound,

    #[error("argument contains a NUL byte")]
    NulByte(#[from] std::ffi::NulError),
}

/// Write `err` as a single `error: ...` line.
pub fn report(out: &mut dyn Write, err: impl Display) -> io::Result<()> {
    writeln!(out, "error: {err}")
}
