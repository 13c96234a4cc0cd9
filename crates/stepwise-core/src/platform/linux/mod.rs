//! # Linux Debugging Implementation
//!
//! ptrace-based [`Tracee`] for x86-64 Linux.
//!
//! ## Key APIs Used
//!
//! - `PTRACE_TRACEME` / `PTRACE_ATTACH`: become the tracer
//! - `PTRACE_PEEKTEXT` / `PTRACE_POKETEXT`: read and patch code one word at a time
//! - `PTRACE_GETREGS` / `PTRACE_SETREGS`: register file
//! - `PTRACE_CONT` / `PTRACE_SINGLESTEP`: execution control
//! - `waitpid()`: stop notifications
//!
//! All calls go through the `nix` crate, which turns `errno` into
//! `nix::Error`. Only the fork/exec handshake needs raw `libc`.
//!
//! ## References
//!
//! - [ptrace(2) man page](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//! - [waitpid(2) man page](https://man7.org/linux/man-pages/man2/waitpid.2.html)

mod launch;
mod registers;

use std::path::Path;

pub use launch::LaunchOptions;
use nix::sys::ptrace::{self, AddressType};
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;

use crate::error::{DebuggerError, Result};
use crate::tracee::Tracee;
use crate::types::{Address, ProcessId, Registers, StopEvent};

const WORD_SIZE: usize = std::mem::size_of::<u64>();
/// Upper bound on the buffer reserved up front by `read_memory`
const MAX_READ_PREALLOC: usize = 64 * 1024;

/// How this process came under our control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin
{
    /// Forked and exec'd by us; killed when dropped
    Launched,
    /// Attached to; detached when dropped
    Attached,
}

/// A process traced with ptrace
///
/// ## Lifecycle
///
/// Created by [`launch`](Self::launch) or [`attach`](Self::attach). Becomes
/// inactive on exit, termination by signal, [`kill`](Tracee::kill) or
/// [`detach`](Tracee::detach), and is never reactivated.
///
/// Dropping a still-active handle kills a launched process and detaches from
/// an attached one, so no tracee is left stopped forever.
#[derive(Debug)]
pub struct TargetProcess
{
    pid: Pid,
    active: bool,
    origin: Origin,
}

impl TargetProcess
{
    /// Launch `program` with `args` under trace.
    ///
    /// The returned process is stopped (or about to stop) on its exec
    /// `SIGTRAP`; the controller consumes that stop in `start()`.
    ///
    /// ## Errors
    ///
    /// - `LaunchFailed`: fork, trace setup or exec failed
    /// - `Io`: the status pipe could not be read
    pub fn launch(program: &Path, args: &[String], options: &LaunchOptions) -> Result<Self>
    {
        let pid = launch::spawn_traced(program, args, options)?;
        Ok(Self {
            pid,
            active: true,
            origin: Origin::Launched,
        })
    }

    /// Attach to the running process `pid`.
    ///
    /// ## Errors
    ///
    /// - `LaunchFailed`: the kernel refused `PTRACE_ATTACH`
    pub fn attach(pid: ProcessId) -> Result<Self>
    {
        let pid = Pid::from(pid);
        launch::attach(pid)?;
        Ok(Self {
            pid,
            active: true,
            origin: Origin::Attached,
        })
    }

    /// Whether the process was launched or attached to.
    #[must_use]
    pub fn origin(&self) -> Origin
    {
        self.origin
    }

    fn ensure_active(&self) -> Result<()>
    {
        if self.active {
            Ok(())
        } else {
            Err(DebuggerError::TargetTerminated { pid: self.pid() })
        }
    }

    fn trace_error(&self, operation: &'static str) -> impl FnOnce(nix::Error) -> DebuggerError
    {
        let pid = self.pid();
        move |source| DebuggerError::trace(operation, pid, source)
    }

    fn peek(&self, addr: Address) -> nix::Result<u64>
    {
        // The kernel hands back a signed long holding the raw word.
        ptrace::read(self.pid, addr.value() as AddressType).map(|word| word as u64)
    }
}

impl Tracee for TargetProcess
{
    fn pid(&self) -> ProcessId
    {
        ProcessId::from(self.pid)
    }

    fn is_active(&self) -> bool
    {
        self.active
    }

    fn read_instruction_word(&self, addr: Address) -> Result<u64>
    {
        self.ensure_active()?;
        self.peek(addr).map_err(self.trace_error("PTRACE_PEEKTEXT"))
    }

    fn write_instruction_word(&mut self, addr: Address, word: u64) -> Result<()>
    {
        self.ensure_active()?;
        ptrace::write(self.pid, addr.value() as AddressType, word as libc::c_long)
            .map_err(self.trace_error("PTRACE_POKETEXT"))
    }

    fn read_registers(&self) -> Result<Registers>
    {
        self.ensure_active()?;
        let raw = ptrace::getregs(self.pid).map_err(self.trace_error("PTRACE_GETREGS"))?;
        Ok(registers::from_user_regs(&raw))
    }

    fn write_registers(&mut self, regs: &Registers) -> Result<()>
    {
        self.ensure_active()?;
        let mut raw = ptrace::getregs(self.pid).map_err(self.trace_error("PTRACE_GETREGS"))?;
        registers::apply_to_user_regs(regs, &mut raw);
        ptrace::setregs(self.pid, raw).map_err(self.trace_error("PTRACE_SETREGS"))
    }

    fn read_memory(&self, addr: Address, len: usize) -> Result<Vec<u8>>
    {
        self.ensure_active()?;
        if len == 0 {
            return Ok(Vec::new());
        }

        let fault = || DebuggerError::MemoryAccess {
            address: addr,
            len,
            pid: self.pid(),
        };

        let start = addr.align_down(WORD_SIZE as u64);
        let skip = (addr.value() - start.value()) as usize;
        let wanted = skip.checked_add(len).ok_or_else(fault)?;

        // Every word up to the rounded end must be addressable.
        let span = wanted
            .checked_add(WORD_SIZE - 1)
            .map(|end| end & !(WORD_SIZE - 1))
            .and_then(|span| u64::try_from(span).ok())
            .ok_or_else(fault)?;
        start.checked_add(span).ok_or_else(fault)?;

        // Capacity is capped; the buffer grows as words are read.
        let mut bytes = Vec::with_capacity(wanted.min(MAX_READ_PREALLOC));
        let mut cursor = start;
        while bytes.len() < wanted {
            let word = self.peek(cursor).map_err(|_| fault())?;
            bytes.extend_from_slice(&word.to_ne_bytes());
            cursor = cursor.checked_add(WORD_SIZE as u64).ok_or_else(fault)?;
        }

        bytes.truncate(wanted);
        bytes.drain(..skip);
        Ok(bytes)
    }

    fn resume(&mut self, signal: Option<Signal>) -> Result<()>
    {
        self.ensure_active()?;
        ptrace::cont(self.pid, signal).map_err(self.trace_error("PTRACE_CONT"))
    }

    fn single_step(&mut self, signal: Option<Signal>) -> Result<()>
    {
        self.ensure_active()?;
        ptrace::step(self.pid, signal).map_err(self.trace_error("PTRACE_SINGLESTEP"))
    }

    fn kill(&mut self) -> Result<()>
    {
        self.ensure_active()?;
        signal::kill(self.pid, Signal::SIGKILL).map_err(self.trace_error("kill"))?;
        self.active = false;
        // Reap it; the exit status is of no interest after SIGKILL.
        waitpid(self.pid, None).map_err(self.trace_error("waitpid"))?;
        tracing::debug!(pid = self.pid.as_raw(), "Target killed");
        Ok(())
    }

    fn detach(&mut self) -> Result<()>
    {
        self.ensure_active()?;
        ptrace::detach(self.pid, None::<Signal>).map_err(self.trace_error("PTRACE_DETACH"))?;
        self.active = false;
        tracing::debug!(pid = self.pid.as_raw(), "Detached from target");
        Ok(())
    }

    fn wait_for_stop(&mut self) -> Result<StopEvent>
    {
        self.ensure_active()?;
        loop {
            let status = waitpid(self.pid, None).map_err(self.trace_error("waitpid"))?;
            tracing::trace!(pid = self.pid.as_raw(), ?status, "waitpid returned");

            match status {
                WaitStatus::Exited(_, code) => {
                    self.active = false;
                    return Ok(StopEvent::Exited(code));
                },
                WaitStatus::Signaled(_, signal, _) => {
                    self.active = false;
                    return Ok(StopEvent::Signaled(signal));
                },
                WaitStatus::Stopped(_, signal) | WaitStatus::PtraceEvent(_, signal, _) => {
                    return Ok(StopEvent::Stopped(signal));
                },
                // Not a state change we report; keep waiting.
                _ => {},
            }
        }
    }
}

impl Drop for TargetProcess
{
    fn drop(&mut self)
    {
        if !self.active {
            return;
        }

        let result = match self.origin {
            Origin::Launched => self.kill(),
            Origin::Attached => self.detach(),
        };
        if let Err(e) = result {
            tracing::warn!(pid = self.pid.as_raw(), "Failed to release target on drop: {e}");
        }
    }
}
