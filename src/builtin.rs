use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::{BuiltinError, report};
use crate::interpreter::Factory;
use anyhow::Result;
use nix::unistd::chdir;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins check their argument count themselves and run directly in the
/// shell process. Arguments are never read as flags: `cd -x` changes into a
/// directory named `-x`. Anything that must affect the shell itself, like its
/// working directory, has to be a builtin: a child's changes die with it.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "cd" or "exit".
    const NAME: &'static str;

    /// Builds the command from the tokens following its name.
    fn parse(args: &[&OsStr]) -> Result<Self, BuiltinError>;

    /// Executes the command against the session environment.
    fn execute(self, env: &mut Environment) -> Result<ExitCode, BuiltinError>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match <T as BuiltinCommand>::execute(*self, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                debug!(builtin = T::NAME, error = %e, "builtin failed");
                report(stdout, e)?;
                Ok(1)
            }
        }
    }
}

/// A builtin invoked with the wrong number of arguments. Running it only
/// reports the error.
struct InvalidArgs {
    error: BuiltinError,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        report(stdout, self.error)?;
        Ok(1)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &OsStr,
        args: &[&OsStr],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::NAME {
            return None;
        }
        Some(match T::parse(args) {
            Ok(cmd) => Box::new(cmd),
            Err(error) => Box::new(InvalidArgs { error }),
        })
    }
}

/// Change the working directory of the shell.
#[derive(Debug)]
pub struct Cd {
    /// Directory to switch to, absolute or relative to the current one.
    pub target: OsString,
}

impl BuiltinCommand for Cd {
    const NAME: &'static str = "cd";

    fn parse(args: &[&OsStr]) -> Result<Self, BuiltinError> {
        match args {
            [] => Err(BuiltinError::MissingArgument),
            [target] => Ok(Cd {
                target: target.to_os_string(),
            }),
            _ => Err(BuiltinError::TooManyArguments),
        }
    }

    fn execute(self, env: &mut Environment) -> Result<ExitCode, BuiltinError> {
        chdir(self.target.as_os_str())?;
        env.current_dir =
            std::env::current_dir().unwrap_or_else(|_| env.current_dir.join(&self.target));
        debug!(cwd = %env.current_dir.display(), "changed directory");
        Ok(0)
    }
}

/// Exit the shell with status 0. Takes no arguments.
#[derive(Debug)]
pub struct Exit;

impl BuiltinCommand for Exit {
    const NAME: &'static str = "exit";

    fn parse(args: &[&OsStr]) -> Result<Self, BuiltinError> {
        if args.is_empty() {
            Ok(Exit)
        } else {
            Err(BuiltinError::UnexpectedArguments)
        }
    }

    fn execute(self, env: &mut Environment) -> Result<ExitCode, BuiltinError> {
        env.should_exit = true;
        Ok(0)
    }
}
