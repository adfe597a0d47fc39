//! A minimal interactive command interpreter.
//!
//! Each iteration prints a `$` prompt, reads one line from standard input into a
//! growable buffer, splits it on spaces and either runs a built-in (`cd`, `exit`)
//! in the shell process or launches the named program in a child created with
//! `clone(2)`, waiting for it before prompting again. There are no pipelines,
//! redirections, quoting, expansions or job control.
//!
//! The main entry point is [`Interpreter`]. [`launcher::spawn_and_wait`] is the
//! process-creation primitive on its own, and the [`command`] and [`env`] modules
//! expose the traits and types used to plug in further commands.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod external;
mod interpreter;
pub mod launcher;
pub mod line_reader;
pub mod signals;
pub mod tokenizer;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

/// Serializes tests that read or change the process working directory.
#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock, PoisonError};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
