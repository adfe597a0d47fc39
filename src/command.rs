use crate::env::Environment;
use anyhow::Result;
use std::ffi::OsStr;
use std::io::Write;

/// Status of a finished command: 0 for success, anything else for failure.
///
/// Children killed by a signal are reported as `128 + signo`, like POSIX shells do.
pub type ExitCode = i32;

/// A command ready to run, created by a [`CommandFactory`].
///
/// Builtins get this through a blanket impl; external programs implement it
/// directly. `stdout` receives the shell's own messages; launched programs
/// write to the process's file descriptor 1 directly.
pub trait ExecutableCommand {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Turns a command name and its arguments into an [`ExecutableCommand`].
///
/// The interpreter asks its factories in order; the first one returning `Some`
/// wins. Names and arguments are raw tokens and need not be UTF-8.
pub trait CommandFactory {
    fn try_create(
        &self,
        env: &Environment,
        name: &OsStr,
        args: &[&OsStr],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
