//! # Linux Process Launch
//!
//! Starting a program under trace with the classic fork / `PTRACE_TRACEME` /
//! `execv` handshake, and attaching to a running process.
//!
//! The child reports any failure before `execv` replaces it through a
//! close-on-exec pipe: if the pipe reaches EOF without data, the exec
//! succeeded and the child is now stopped on its exec `SIGTRAP`.
//!
//! ## References
//!
//! - [ptrace(2) man page](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//! - [personality(2) man page](https://man7.org/linux/man-pages/man2/personality.2.html)

use std::ffi::CString;
use std::fs::File;
use std::io::Read;
use std::os::fd::{FromRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::personality::{self, Persona};
use nix::sys::ptrace;
use nix::sys::wait::waitpid;
use nix::unistd::{execv, fork, ForkResult, Pid};

use crate::error::{DebuggerError, Result};

/// Knobs for [`TargetProcess::launch`](super::TargetProcess::launch)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions
{
    /// Turn off address space layout randomization in the child, so
    /// breakpoint addresses are stable from run to run.
    pub disable_aslr: bool,
}

/// Step in the child that can fail before `execv` takes over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
enum ChildStage
{
    Personality = 1,
    TraceMe = 2,
    Exec = 3,
}

impl ChildStage
{
    fn from_raw(raw: i32) -> Option<Self>
    {
        match raw {
            1 => Some(ChildStage::Personality),
            2 => Some(ChildStage::TraceMe),
            3 => Some(ChildStage::Exec),
            _ => None,
        }
    }

    fn describe(self) -> &'static str
    {
        match self {
            ChildStage::Personality => "personality(ADDR_NO_RANDOMIZE)",
            ChildStage::TraceMe => "PTRACE_TRACEME",
            ChildStage::Exec => "execv",
        }
    }
}

/// Fork and exec `program` with tracing enabled in the child.
///
/// `argv[0]` is the program path itself, followed by `args`.
///
/// ## Errors
///
/// - `LaunchFailed`: a path or argument contains a NUL byte, the pipe or
///   the fork could not be created, or the child reported a failure
pub(crate) fn spawn_traced(program: &Path, args: &[String], options: &LaunchOptions) -> Result<Pid>
{
    let path = CString::new(program.as_os_str().as_bytes())
        .map_err(|e| DebuggerError::LaunchFailed(format!("Invalid program path: {e}")))?;
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(path.clone());
    for arg in args {
        argv.push(
            CString::new(arg.as_bytes()).map_err(|e| DebuggerError::LaunchFailed(format!("Invalid argument: {e}")))?,
        );
    }

    let (read_fd, write_fd) = create_status_pipe()?;

    tracing::info!(program = %program.display(), ?args, "Launching process");
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            // Only async-signal-safe work from here on; everything was
            // allocated before the fork.
            if options.disable_aslr {
                let disabled = personality::get().and_then(|p| personality::set(p | Persona::ADDR_NO_RANDOMIZE));
                if let Err(errno) = disabled {
                    report_and_exit(write_fd, ChildStage::Personality, errno);
                }
            }
            if let Err(errno) = ptrace::traceme() {
                report_and_exit(write_fd, ChildStage::TraceMe, errno);
            }
            let errno = match execv(&path, &argv) {
                Ok(never) => match never {},
                Err(errno) => errno,
            };
            report_and_exit(write_fd, ChildStage::Exec, errno)
        },
        Ok(ForkResult::Parent { child }) => {
            // SAFETY: both descriptors come from pipe2 and are owned here.
            drop(unsafe { File::from_raw_fd(write_fd) });
            let mut status_pipe = unsafe { File::from_raw_fd(read_fd) };

            let mut report = Vec::new();
            status_pipe.read_to_end(&mut report)?;
            if report.is_empty() {
                tracing::debug!(pid = child.as_raw(), "Child exec'd under trace");
                return Ok(child);
            }

            // The child is gone; reap it so it does not linger as a zombie.
            let _ = waitpid(child, None);
            Err(DebuggerError::LaunchFailed(decode_report(&report, program)))
        },
        Err(errno) => {
            // SAFETY: fork failed, nobody else owns the descriptors.
            drop(unsafe { File::from_raw_fd(write_fd) });
            drop(unsafe { File::from_raw_fd(read_fd) });
            Err(DebuggerError::LaunchFailed(format!("fork failed: {errno}")))
        },
    }
}

/// Start tracing an already running process.
///
/// The attach `SIGSTOP` is left for the controller's initial wait.
///
/// ## Errors
///
/// - `LaunchFailed`: `PTRACE_ATTACH` was refused (permissions, Yama
///   `ptrace_scope`, no such process)
pub(crate) fn attach(pid: Pid) -> Result<()>
{
    tracing::info!(pid = pid.as_raw(), "Attaching to process");
    ptrace::attach(pid).map_err(|e| DebuggerError::LaunchFailed(format!("Unable to attach to pid {pid}: {e}")))
}

fn create_status_pipe() -> Result<(RawFd, RawFd)>
{
    let mut fds: [libc::c_int; 2] = [0; 2];
    // SAFETY: fds is a valid two-element buffer.
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
        let err = std::io::Error::last_os_error();
        return Err(DebuggerError::LaunchFailed(format!("Failed to create status pipe: {err}")));
    }
    Ok((fds[0], fds[1]))
}

fn report_and_exit(fd: RawFd, stage: ChildStage, errno: Errno) -> !
{
    let mut buf = [0u8; 8];
    buf[..4].copy_from_slice(&(stage as i32).to_ne_bytes());
    buf[4..].copy_from_slice(&(errno as i32).to_ne_bytes());
    // SAFETY: write(2) and _exit(2) are async-signal-safe; buf outlives the call.
    unsafe {
        libc::write(fd, buf.as_ptr().cast(), buf.len());
        libc::_exit(127)
    }
}

fn decode_report(report: &[u8], program: &Path) -> String
{
    let field = |range: std::ops::Range<usize>| {
        report
            .get(range)
            .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
            .map(i32::from_ne_bytes)
    };

    match (field(0..4).and_then(ChildStage::from_raw), field(4..8)) {
        (Some(stage), Some(errno)) => {
            format!("{} failed for '{}': {}", stage.describe(), program.display(), Errno::from_raw(errno))
        },
        _ => format!("Child for '{}' failed before exec", program.display()),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_decode_report_names_stage_and_errno()
    {
        let mut report = Vec::new();
        report.extend_from_slice(&3i32.to_ne_bytes());
        report.extend_from_slice(&(Errno::ENOENT as i32).to_ne_bytes());

        let message = decode_report(&report, Path::new("/nope"));
        assert!(message.contains("execv"));
        assert!(message.contains("/nope"));
        assert!(message.contains("ENOENT"));
    }

    #[test]
    fn test_decode_report_truncated()
    {
        let message = decode_report(&[1, 0], Path::new("/bin/x"));
        assert!(message.contains("before exec"));
    }
}
