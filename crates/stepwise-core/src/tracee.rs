//! # Tracee Trait
//!
//! The trace primitives the execution controller drives.
//!
//! Each backend implements this trait with its own system APIs:
//!
//! - **Linux**: `ptrace(2)` + `waitpid(2)` (see [`crate::platform::linux`])
//!
//! The controller and the breakpoint table are generic over `Tracee`, so the
//! whole breakpoint state machine is statically dispatched and can be driven
//! by an in-memory implementation in tests.
//!
//! ## Contract
//!
//! - Every method that touches the OS fails with
//!   [`DebuggerError::TraceOperationFailed`](crate::error::DebuggerError::TraceOperationFailed)
//!   naming the primitive and the pid.
//! - Once [`Tracee::is_active`] returns `false` every operation fails with
//!   [`DebuggerError::TargetTerminated`](crate::error::DebuggerError::TargetTerminated).
//! - `wait_for_stop` clears liveness for `Exited` / `Signaled` events.

use nix::sys::signal::Signal;

use crate::error::Result;
use crate::types::{Address, ProcessId, Registers, StopEvent};

/// Primitive trace-control operations on one traced process
///
/// ## Thread Safety
///
/// Only the thread that became the tracer may issue ptrace requests, so
/// implementations are used from a single thread and no method is expected
/// to be called while another one is blocked in `wait_for_stop`.
pub trait Tracee
{
    /// Identifier of the traced process.
    fn pid(&self) -> ProcessId;

    /// Whether the process still exists and is under our control.
    fn is_active(&self) -> bool;

    /// Read one machine word of code at `addr`.
    ///
    /// ## Platform-specific behavior
    ///
    /// - **Linux**: `ptrace(PTRACE_PEEKTEXT, pid, addr)`
    fn read_instruction_word(&self, addr: Address) -> Result<u64>;

    /// Write one machine word of code at `addr`.
    ///
    /// ## Platform-specific behavior
    ///
    /// - **Linux**: `ptrace(PTRACE_POKETEXT, pid, addr, word)`
    fn write_instruction_word(&mut self, addr: Address, word: u64) -> Result<()>;

    /// Read the whole register file.
    ///
    /// ## Platform-specific behavior
    ///
    /// - **Linux**: `ptrace(PTRACE_GETREGS, pid)`
    fn read_registers(&self) -> Result<Registers>;

    /// Write the whole register file.
    ///
    /// ## ⚠️ Warning
    ///
    /// Modifying registers can crash the process. Only do this if you know
    /// what you're doing!
    fn write_registers(&mut self, regs: &Registers) -> Result<()>;

    /// Read `len` bytes starting at `addr`.
    ///
    /// ## Errors
    ///
    /// - `MemoryAccess`: some part of the range is not readable
    fn read_memory(&self, addr: Address, len: usize) -> Result<Vec<u8>>;

    /// Let the process run until its next stop, optionally delivering `signal`.
    fn resume(&mut self, signal: Option<Signal>) -> Result<()>;

    /// Execute exactly one machine instruction, then stop.
    fn single_step(&mut self, signal: Option<Signal>) -> Result<()>;

    /// Terminate the process immediately. Clears liveness.
    fn kill(&mut self) -> Result<()>;

    /// Release tracing control, leaving the process running. Clears liveness.
    fn detach(&mut self) -> Result<()>;

    /// Block until the process changes state and classify the result.
    fn wait_for_stop(&mut self) -> Result<StopEvent>;
}
