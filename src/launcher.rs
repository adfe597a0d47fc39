//! Launching external programs in a child process and waiting for them.
//!
//! Each launch walks `Idle -> StackAllocated -> Spawning -> ChildRunning ->
//! Reaped`, or `SpawnFailed` straight back to idle. The child is created with
//! `clone(2)` on a dedicated stack and without any sharing flags, which gives
//! it a private copy of the parent's address space.

use crate::command::ExitCode;
use crate::config::DEFAULT_STACK_SIZE;
use crate::error::LaunchError;
use crate::signals;
use nix::errno::Errno;
use nix::libc::{self, STDOUT_FILENO, c_char, c_int};
use nix::sched::{CloneFlags, clone};
use nix::sys::mman::{MapFlags, ProtFlags, mmap_anonymous, munmap};
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use std::ffi::{CString, OsStr, c_void};
use std::fs::File;
use std::io::Write;
use std::mem::ManuallyDrop;
use std::num::NonZeroUsize;
use std::os::fd::FromRawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// Everything needed to start one external program.
#[derive(Debug, Clone)]
pub struct SpawnRequest<'a> {
    program: &'a Path,
    argv: Vec<&'a OsStr>,
    env: Vec<String>,
    stack_size: usize,
}

impl<'a> SpawnRequest<'a> {
    /// `argv` is passed verbatim, including `argv[0]`.
    pub fn new<A: AsRef<OsStr> + ?Sized>(program: &'a Path, argv: &[&'a A]) -> Self {
        Self {
            program,
            argv: argv.iter().map(|&arg| OsStr::new(arg)).collect(),
            env: Vec::new(),
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Replace the child environment with `vars`.
    pub fn env<K: AsRef<str>, V: AsRef<str>>(mut self, vars: &[(K, V)]) -> Self {
        self.env = vars
            .iter()
            .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
            .collect();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }
}

/// Anonymous private mapping used as the child's initial stack.
///
/// Unmapped on drop. The child runs on its own copy of this region, so the
/// parent may release it as soon as `clone` has returned.
pub struct ChildStack {
    base: NonNull<c_void>,
    len: NonZeroUsize,
}

impl ChildStack {
    pub fn allocate(len: usize) -> Result<Self, LaunchError> {
        let len = NonZeroUsize::new(len).ok_or(LaunchError::EmptyStack)?;
        // SAFETY: a fresh anonymous mapping aliases no existing memory.
        let base = unsafe {
            mmap_anonymous(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_PRIVATE,
            )
        }
        .map_err(LaunchError::StackAlloc)?;
        Ok(Self { base, len })
    }

    fn len(&self) -> usize {
        self.len.get()
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the mapping is readable, writable and exactly `len` bytes
        // long for as long as `self` lives.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr().cast::<u8>(), self.len()) }
    }
}

impl Drop for ChildStack {
    fn drop(&mut self) {
        // SAFETY: `base`/`len` describe a mapping created in `allocate` and
        // no slice into it outlives `self`.
        if let Err(errno) = unsafe { munmap(self.base, self.len.get()) } {
            warn!(%errno, "failed to release child stack");
        }
    }
}

/// Everything `execve` reads, built before the child exists so that the
/// child itself never allocates.
///
/// `argv_ptrs` and `envp_ptrs` are null-terminated and point into the heap
/// buffers owned by `_argv` and `_envp`, which do not move while `self` lives.
struct ChildImage {
    path: CString,
    _argv: Vec<CString>,
    _envp: Vec<CString>,
    argv_ptrs: Vec<*const c_char>,
    envp_ptrs: Vec<*const c_char>,
}

impl ChildImage {
    fn new(request: &SpawnRequest<'_>) -> Result<Self, LaunchError> {
        let path = CString::new(request.program.as_os_str().as_bytes())?;
        let mut argv = request
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        if argv.is_empty() {
            argv.push(path.clone());
        }
        let envp = request
            .env
            .iter()
            .map(|entry| CString::new(entry.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let argv_ptrs = null_terminated(&argv);
        let envp_ptrs = null_terminated(&envp);
        Ok(Self {
            path,
            _argv: argv,
            _envp: envp,
            argv_ptrs,
            envp_ptrs,
        })
    }
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// Run `request` to completion and return its exit code.
///
/// Signal deaths map to `128 + signo`. A program that cannot be executed
/// reports the error on stdout from inside the child and exits with 1, so
/// `Ok(1)` is returned in that case. Errors are only returned for failures
/// the parent observes itself.
pub fn spawn_and_wait(request: &SpawnRequest<'_>) -> Result<ExitCode, LaunchError> {
    let image = ChildImage::new(request)?;
    let mut stack = ChildStack::allocate(request.stack_size)?;

    // SAFETY: without CLONE_VM the child gets a copy of the address space and
    // only runs `child_entry`, which is limited to async-signal-safe calls.
    let pid = unsafe {
        clone(
            Box::new(|| child_entry(&image)),
            stack.as_mut_slice(),
            CloneFlags::empty(),
            Some(Signal::SIGCHLD as c_int),
        )
    }
    .map_err(LaunchError::Spawn)?;
    debug!(%pid, program = %request.program.display(), "child started");

    let status = loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            other => break other.map_err(LaunchError::Wait)?,
        }
    };
    debug!(%pid, ?status, "child reaped");
    Ok(exit_code(status))
}

fn child_entry(image: &ChildImage) -> isize {
    let _ = signals::restore_default_interrupts();
    // SAFETY: `path` and both null-terminated arrays point into `image`,
    // which the parent keeps alive until after `clone` returns; the child
    // works on its own copy of it.
    unsafe {
        libc::execve(
            image.path.as_ptr(),
            image.argv_ptrs.as_ptr(),
            image.envp_ptrs.as_ptr(),
        )
    };
    report_raw(Errno::last());
    // SAFETY: `_exit` is async-signal-safe and runs no exit handlers.
    unsafe { libc::_exit(1) }
}

/// `error: <strerror>` straight to fd 1, bypassing the locked `Stdout`.
fn report_raw(errno: Errno) {
    // SAFETY: fd 1 stays open; ManuallyDrop keeps it from being closed here.
    let mut out = ManuallyDrop::new(unsafe { File::from_raw_fd(STDOUT_FILENO) });
    let _ = out.write_all(b"error: ");
    let _ = out.write_all(errno.desc().as_bytes());
    let _ = out.write_all(b"\n");
}

fn exit_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::{SigHandler, signal};

    const SH: &str = "/bin/sh";

    fn sh(script: &str) -> Result<ExitCode, LaunchError> {
        spawn_and_wait(&SpawnRequest::new(Path::new(SH), &["sh", "-c", script]))
    }

    #[test]
    fn test_exit_status_is_returned() {
        assert_eq!(sh("exit 0").unwrap(), 0);
        assert_eq!(sh("exit 3").unwrap(), 3);
    }

    #[test]
    fn test_signal_death_maps_to_128_plus_signo() {
        assert_eq!(sh("kill -TERM $$").unwrap(), 128 + Signal::SIGTERM as i32);
    }

    #[test]
    fn test_missing_program_exits_child_with_one() {
        let program = Path::new("/nonexistent-dir-xyz/program");
        let code = spawn_and_wait(&SpawnRequest::new(program, &["program"])).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn test_child_sees_only_given_environment() {
        let script = "test \"$TERM\" = dumb && test -z \"$HOME\"";
        let request =
            SpawnRequest::new(Path::new(SH), &["sh", "-c", script]).env(&[("TERM", "dumb")]);
        assert_eq!(spawn_and_wait(&request).unwrap(), 0);
    }

    #[test]
    fn test_nul_byte_is_rejected_before_spawning() {
        let request = SpawnRequest::new(Path::new(SH), &["sh", "a\0b"]);
        assert!(matches!(
            spawn_and_wait(&request),
            Err(LaunchError::NulByte(_))
        ));
    }

    #[test]
    fn test_image_arrays_are_null_terminated() {
        let request = SpawnRequest::new(Path::new(SH), &["sh", "-c", "true"])
            .env(&[("TERM", "xterm")]);
        let image = ChildImage::new(&request).unwrap();

        assert_eq!(image.argv_ptrs.len(), 4);
        assert!(image.argv_ptrs[3].is_null());
        assert_eq!(image.envp_ptrs.len(), 2);
        assert!(image.envp_ptrs[1].is_null());
        // SAFETY: the pointers refer to strings owned by `image`.
        let first = unsafe { std::ffi::CStr::from_ptr(image.argv_ptrs[0]) };
        assert_eq!(first.to_bytes(), b"sh");
        let term = unsafe { std::ffi::CStr::from_ptr(image.envp_ptrs[0]) };
        assert_eq!(term.to_bytes(), b"TERM=xterm");
    }

    #[test]
    fn test_non_utf8_argument_reaches_child() {
        let arg = OsStr::from_bytes(b"caf\xe9");
        let script = OsStr::new("test \"$1\" = \"$(printf 'caf\\351')\"");
        let request = SpawnRequest::new(
            Path::new(SH),
            &[OsStr::new("sh"), OsStr::new("-c"), script, OsStr::new("sh"), arg],
        );
        assert_eq!(spawn_and_wait(&request).unwrap(), 0);
    }

    #[test]
    fn test_zero_sized_stack_is_rejected() {
        assert!(matches!(ChildStack::allocate(0), Err(LaunchError::EmptyStack)));
        let request = SpawnRequest::new(Path::new(SH), &["sh"]).stack_size(0);
        assert!(matches!(
            spawn_and_wait(&request),
            Err(LaunchError::EmptyStack)
        ));
    }

    #[test]
    fn test_stack_is_usable_memory() {
        let mut stack = ChildStack::allocate(DEFAULT_STACK_SIZE).unwrap();
        assert_eq!(stack.len(), DEFAULT_STACK_SIZE);
        let slice = stack.as_mut_slice();
        slice[0] = 1;
        slice[DEFAULT_STACK_SIZE - 1] = 2;
        assert_eq!(slice[0] + slice[DEFAULT_STACK_SIZE - 1], 3);
    }

    #[test]
    fn test_child_gets_default_interrupt_action() {
        // A non-interactive sh keeps SIGINT ignored if it starts that way, so
        // the script only dies from its own signal if the launcher reset it.
        signals::ignore_interrupts().unwrap();
        let code = sh("kill -INT $$; exit 7");
        // SAFETY: SIG_DFL installs no handler code.
        let previous = unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) }.unwrap();

        assert_eq!(previous, SigHandler::SigIgn);
        assert_eq!(code.unwrap(), 128 + Signal::SIGINT as i32);
    }
}
