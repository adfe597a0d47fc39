//! SIGINT disposition for the shell and its children.
//!
//! The shell ignores interrupts for its whole session so Ctrl-C never kills
//! it. An ignored disposition survives `execve`, so every child switches back
//! to the default action before replacing its image.

use nix::errno::Errno;
use nix::sys::signal::{SigHandler, Signal, signal};

/// Ignore SIGINT in the calling process. Called once at startup.
pub fn ignore_interrupts() -> Result<(), Errno> {
    // SAFETY: SIG_IGN installs no handler code.
    unsafe { signal(Signal::SIGINT, SigHandler::SigIgn) }?;
    tracing::debug!("SIGINT ignored for the session");
    Ok(())
}

/// Restore the default SIGINT action.
///
/// Async-signal-safe; runs in a freshly cloned child before `execve`.
pub fn restore_default_interrupts() -> Result<(), Errno> {
    // SAFETY: SIG_DFL installs no handler code.
    unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) }.map(drop)
}
