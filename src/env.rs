use crate::config::ShellConfig;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::PathBuf;

/// Session state shared by the built-ins and the launcher.
///
/// The environment contains:
/// - `child_vars`: the fixed variables handed to launched programs. This is
///   deliberately not the shell's own environment.
/// - `search_paths`: the shell's `PATH`, used to resolve program names.
/// - `current_dir`: the working directory after the last successful `cd`.
/// - `stack_size`: bytes reserved for each child's stack.
/// - `should_exit`: set by `exit`; the read loop stops once it is true.
#[derive(Debug, Clone)]
pub struct Environment {
    pub child_vars: Vec<(String, String)>,
    pub search_paths: Option<OsString>,
    pub current_dir: PathBuf,
    pub stack_size: usize,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state for a new session.
    pub fn new(config: &ShellConfig) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            child_vars: config.child_env(),
            search_paths: stdenv::var_os("PATH"),
            current_dir,
            stack_size: config.stack_size,
            should_exit: false,
        }
    }
}
