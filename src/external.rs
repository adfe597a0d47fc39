use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::{LaunchError, report};
use crate::interpreter::Factory;
use crate::launcher::{SpawnRequest, spawn_and_wait};
use anyhow::Result;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Command that is not a builtin.
///
/// `program` is `None` when a bare name was not found on `PATH`.
pub struct ExternalCommand {
    name: OsString,
    program: Option<PathBuf>,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, program: Option<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            name,
            program,
            args,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    /// Accepts every name. A path containing `/` that does not name an
    /// executable is kept as typed so `execve` reports why. A bare name
    /// missing from `PATH` is never looked up in the current directory.
    fn try_create(
        &self,
        env: &Environment,
        name: &OsStr,
        args: &[&OsStr],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let path = Path::new(name);
        let program = match find_command_path(env.search_paths.as_deref(), path) {
            Some(found) => Some(found.into_owned()),
            None if name.as_bytes().contains(&b'/') => Some(path.to_path_buf()),
            None => None,
        };
        Some(Box::new(ExternalCommand::new(
            name.to_os_string(),
            program,
            args.iter().map(|x| x.to_os_string()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        // Anything still buffered must reach the terminal before the child writes.
        stdout.flush()?;

        let Some(program) = self.program.as_deref() else {
            debug!(name = ?self.name, "not found on PATH");
            report(stdout, LaunchError::NotFound)?;
            return Ok(1);
        };
        let argv: Vec<&OsStr> = std::iter::once(self.name.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .collect();
        let request = SpawnRequest::new(program, &argv)
            .env(&env.child_vars)
            .stack_size(env.stack_size);

        match spawn_and_wait(&request) {
            Ok(code) => {
                debug!(program = %program.display(), code, "command finished");
                Ok(code)
            }
            Err(e) => {
                warn!(program = %program.display(), error = %e, "launch failed");
                report(stdout, e)?;
                Ok(1)
            }
        }
    }
}

/// Resolve a command path the way `execvp` does.
///
/// Behavior:
/// - Empty path: returns `None`.
/// - Path containing a `/` (absolute, `./foo`, `bin/sh`): used as given, returned
///   if it names an executable file.
/// - Single path component: each directory in `search_paths` (PATH) is tried in
///   order and the first executable file wins. An empty entry means the current
///   directory.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(
    search_paths: Option<&OsStr>,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    let raw = path.as_os_str().as_bytes();
    if raw.is_empty() {
        return None;
    }
    if raw.contains(&b'/') {
        return as_executable(path).map(Cow::Borrowed);
    }
    find_in_path(search_paths?, path.as_os_str()).map(Cow::Owned)
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| as_executable(candidate).is_some())
}

fn as_executable(path: &Path) -> Option<&Path> {
    let meta = path.metadata().ok()?;
    if meta.is_file() && meta.permissions().mode() & 0o111 != 0 {
        Some(path)
    } else {
        None
    }
}
