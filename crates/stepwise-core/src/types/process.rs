//! Process identifiers and stop classification types.

use std::fmt;

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use super::Address;

/// Process identifier (PID)
///
/// A PID is assigned to each running process by the operating system. On
/// Linux it is a signed 32-bit `pid_t`.
///
/// ## Example
///
/// ```rust
/// use stepwise_core::types::ProcessId;
///
/// let pid = ProcessId::from(12345);
/// assert_eq!(pid.0, 12345);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub i32);

impl From<i32> for ProcessId
{
    fn from(pid: i32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for i32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl From<Pid> for ProcessId
{
    fn from(pid: Pid) -> Self
    {
        ProcessId(pid.as_raw())
    }
}

impl From<ProcessId> for Pid
{
    fn from(pid: ProcessId) -> Self
    {
        Pid::from_raw(pid.0)
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Raw, classified result of waiting on the traced process
///
/// This is what `waitpid` tells us, before the controller applies any
/// breakpoint bookkeeping on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopEvent
{
    /// The process exited normally with the given status code
    Exited(i32),
    /// The process was terminated by a signal
    Signaled(Signal),
    /// The process is stopped (still alive) because of a signal
    ///
    /// Breakpoint traps and completed single steps both arrive as
    /// `Stopped(SIGTRAP)`.
    Stopped(Signal),
}

impl StopEvent
{
    /// Whether this event ends the process's life.
    #[must_use]
    pub const fn is_terminal(self) -> bool
    {
        matches!(self, StopEvent::Exited(_) | StopEvent::Signaled(_))
    }
}

/// Reason the debugger reports to the user after an operation
///
/// ## State Transitions
///
/// - `Breakpoint(addr)`: a software breakpoint at `addr` fired; the program
///   counter has been rolled back onto `addr`
/// - `Step(pc)`: a single step completed and the target now sits at `pc`
/// - `Signal(sig, pc)`: the target stopped because of some other signal
/// - `Exited`, `Signaled`, `Faulted`, `Killed`, `Detached`: the session is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason
{
    /// Hit a software breakpoint at the provided address
    Breakpoint(Address),
    /// Completed a single step; the target stopped at this address
    Step(Address),
    /// Stopped by a signal that is not a breakpoint trap
    Signal(Signal, Address),
    /// Process exited with status code
    ///
    /// Once a process has exited, it cannot be resumed or debugged further.
    Exited(i32),
    /// Process was terminated by a signal
    Signaled(Signal),
    /// Process stopped with a signal from the fatal set and was put down
    Faulted(Signal),
    /// Process was killed by the debugger
    Killed,
    /// Debugger released the process, which keeps running untraced
    Detached,
}

impl StopReason
{
    /// Whether the session can no longer be driven after this stop.
    #[must_use]
    pub const fn is_terminal(self) -> bool
    {
        matches!(
            self,
            StopReason::Exited(_)
                | StopReason::Signaled(_)
                | StopReason::Faulted(_)
                | StopReason::Killed
                | StopReason::Detached
        )
    }

    /// Program counter the target is stopped at, if it is still alive.
    #[must_use]
    pub const fn location(self) -> Option<Address>
    {
        match self {
            StopReason::Breakpoint(addr) | StopReason::Step(addr) | StopReason::Signal(_, addr) => Some(addr),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            StopReason::Breakpoint(addr) => write!(f, "Hit breakpoint at {addr}"),
            StopReason::Step(addr) => write!(f, "Stepped to {addr}"),
            StopReason::Signal(sig, addr) => write!(f, "Stopped by signal {sig} at {addr}"),
            StopReason::Exited(code) => write!(f, "Process exited with code: {code}"),
            StopReason::Signaled(sig) => write!(f, "Process terminated by signal: {sig}"),
            StopReason::Faulted(sig) => write!(f, "Process faulted with {sig} and was terminated"),
            StopReason::Killed => write!(f, "Process was killed"),
            StopReason::Detached => write!(f, "Detached from process"),
        }
    }
}
