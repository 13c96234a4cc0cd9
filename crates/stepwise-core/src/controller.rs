//! # Execution Controller
//!
//! Owns one debugging session: the traced process, its breakpoint table and
//! the single pending step-over slot.
//!
//! ## State machine
//!
//! ```text
//! NotStarted ──start()──► Running ──wait──► StoppedAtBreakpoint(addr)
//!                            ▲                │
//!                            │                ▼
//!                            └──continue──  StoppedOther(signal)
//!                                             │
//!                     exit / fatal / kill / detach
//!                                             ▼
//!                                          Terminal
//! ```
//!
//! ## Step-over protocol
//!
//! When a breakpoint fires, the trap opcode is lifted and the program counter
//! is rolled back onto the breakpoint address. The breakpoint's address is
//! remembered as *pending*. The next `continue_execution()` or `step_into()`
//! first single-steps the original instruction, classifies that step while
//! the breakpoint is still lifted, and only then writes the trap opcode back.
//! At most one re-arm is owed at any time.

use nix::sys::signal::Signal;

use crate::arch::TrapInstruction;
use crate::breakpoints::{BreakpointInfo, BreakpointTable, SetBreakpointOutcome};
use crate::error::{DebuggerError, Result};
use crate::tracee::Tracee;
use crate::types::{Address, ProcessId, RegisterId, Registers, StopEvent, StopReason};

/// Session policy
///
/// ## Example
///
/// ```rust
/// use nix::sys::signal::Signal;
/// use stepwise_core::ControllerOptions;
///
/// let options = ControllerOptions {
///     fatal_signals: vec![Signal::SIGSEGV, Signal::SIGBUS],
///     forward_signals: true,
///     ..ControllerOptions::default()
/// };
/// assert!(options.is_fatal(Signal::SIGBUS));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions
{
    /// Stop signals after which the target is killed and the session ends.
    pub fatal_signals: Vec<Signal>,
    /// Signal the OS uses to report breakpoint traps and completed steps.
    pub trap_signal: Signal,
    /// Re-deliver non-trap, non-fatal stop signals on the next resume/step.
    ///
    /// Off by default: every such signal is swallowed by the debugger.
    pub forward_signals: bool,
    /// Trap instruction patched in for breakpoints.
    pub trap: TrapInstruction,
}

impl ControllerOptions
{
    /// Whether `signal` belongs to the fatal set.
    #[must_use]
    pub fn is_fatal(&self, signal: Signal) -> bool
    {
        self.fatal_signals.contains(&signal)
    }
}

impl Default for ControllerOptions
{
    fn default() -> Self
    {
        Self {
            fatal_signals: vec![Signal::SIGSEGV],
            trap_signal: Signal::SIGTRAP,
            forward_signals: false,
            trap: TrapInstruction::default(),
        }
    }
}

/// Where the session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState
{
    /// The initial stop has not been consumed yet
    NotStarted,
    /// The target has been resumed and we are waiting for it
    Running,
    /// Stopped on an enabled breakpoint at this address (now lifted)
    StoppedAtBreakpoint(Address),
    /// Stopped for any other reason, including a completed single step
    StoppedOther(Signal),
    /// The session is over; every trace operation is refused
    Terminal(StopReason),
}

impl ExecutionState
{
    /// Whether the target is stopped and can be inspected or resumed.
    #[must_use]
    pub const fn is_stopped(self) -> bool
    {
        matches!(self, ExecutionState::StoppedAtBreakpoint(_) | ExecutionState::StoppedOther(_))
    }
}

/// Drives one traced process
///
/// Generic over the [`Tracee`] so the same state machine runs against the
/// Linux ptrace backend and against in-memory fakes.
///
/// ## Example
///
/// ```rust,no_run
/// # #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
/// # fn main() -> stepwise_core::Result<()> {
/// use stepwise_core::platform::linux::{LaunchOptions, TargetProcess};
/// use stepwise_core::{Address, ControllerOptions, ExecutionController};
///
/// let target = TargetProcess::launch("/bin/true".as_ref(), &[], &LaunchOptions::default())?;
/// let mut controller = ExecutionController::new(target, ControllerOptions::default());
/// controller.start()?;
/// controller.set_breakpoint(Address::new(0x401000))?;
/// let stop = controller.continue_execution()?;
/// println!("{stop}");
/// # Ok(())
/// # }
/// # #[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct ExecutionController<T: Tracee>
{
    tracee: T,
    breakpoints: BreakpointTable,
    pending: Option<Address>,
    state: ExecutionState,
    options: ControllerOptions,
    deferred_signal: Option<Signal>,
    last_stop: Option<StopReason>,
}

impl<T: Tracee> ExecutionController<T>
{
    /// Take ownership of `tracee` and prepare a session for it.
    ///
    /// Nothing is waited on until [`start`](Self::start) is called.
    pub fn new(tracee: T, options: ControllerOptions) -> Self
    {
        Self {
            breakpoints: BreakpointTable::new(options.trap),
            tracee,
            pending: None,
            state: ExecutionState::NotStarted,
            options,
            deferred_signal: None,
            last_stop: None,
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> ExecutionState
    {
        self.state
    }

    /// Traced process.
    #[must_use]
    pub fn pid(&self) -> ProcessId
    {
        self.tracee.pid()
    }

    /// Whether the session can still be driven.
    #[must_use]
    pub fn is_active(&self) -> bool
    {
        !matches!(self.state, ExecutionState::Terminal(_)) && self.tracee.is_active()
    }

    /// Address of the breakpoint owed a re-arm, if any.
    #[must_use]
    pub fn pending_step_over(&self) -> Option<Address>
    {
        self.pending
    }

    /// The reason reported by the most recent stop.
    #[must_use]
    pub fn last_stop(&self) -> Option<StopReason>
    {
        self.last_stop
    }

    /// Session policy in effect.
    #[must_use]
    pub fn options(&self) -> &ControllerOptions
    {
        &self.options
    }

    /// Borrow the underlying tracee.
    #[must_use]
    pub fn tracee(&self) -> &T
    {
        &self.tracee
    }

    /// Consume the initial stop of a freshly launched or attached process.
    ///
    /// The exec `SIGTRAP` (or the attach `SIGSTOP`) can never be a breakpoint
    /// trap because no breakpoint exists yet.
    ///
    /// Calling this on a session that already started returns the last
    /// reported stop without waiting again.
    ///
    /// ## Errors
    ///
    /// - `TargetTerminated`: the session already ended
    /// - trace errors from the wait
    pub fn start(&mut self) -> Result<StopReason>
    {
        match self.state {
            ExecutionState::NotStarted => {},
            ExecutionState::Terminal(_) => return Err(self.terminated()),
            _ => {
                if let Some(reason) = self.last_stop {
                    return Ok(reason);
                }
            },
        }

        tracing::info!(pid = self.pid().0, "Waiting for initial stop");
        self.state = ExecutionState::Running;
        let reason = self.wait_and_classify()?;
        // The exec trap / attach SIGSTOP is ours, never the program's.
        self.deferred_signal = None;
        Ok(reason)
    }

    /// Turn a raw wait result into a [`StopReason`], doing the breakpoint
    /// bookkeeping for traps.
    ///
    /// - `Exited` / `Signaled`: the session ends
    /// - a signal from the fatal set: the target is killed and the session ends
    /// - the trap signal with an enabled breakpoint just before the program
    ///   counter: the breakpoint is lifted, the pc rolled back and the
    ///   breakpoint becomes the pending step-over
    /// - anything else: a plain stop, no bookkeeping
    ///
    /// ## Errors
    ///
    /// Trace errors from reading or writing registers or code. On error no
    /// pending step-over is recorded.
    pub fn classify_stop(&mut self, event: StopEvent) -> Result<StopReason>
    {
        let reason = match event {
            StopEvent::Exited(code) => self.enter_terminal(StopReason::Exited(code)),
            StopEvent::Signaled(signal) => self.enter_terminal(StopReason::Signaled(signal)),
            StopEvent::Stopped(signal) if self.options.is_fatal(signal) => {
                tracing::error!(pid = self.pid().0, signal = %signal, "Fatal signal, terminating target");
                if let Err(e) = self.tracee.kill() {
                    tracing::warn!(pid = self.pid().0, "Failed to kill faulted target: {e}");
                }
                self.enter_terminal(StopReason::Faulted(signal))
            },
            StopEvent::Stopped(signal) if signal == self.options.trap_signal => self.classify_trap(signal)?,
            StopEvent::Stopped(signal) => {
                self.state = ExecutionState::StoppedOther(signal);
                if self.options.forward_signals {
                    self.deferred_signal = Some(signal);
                }
                let pc = self.tracee.read_registers()?.pc();
                tracing::info!(pid = self.pid().0, signal = %signal, pc = %pc, "Target stopped by signal");
                StopReason::Signal(signal, pc)
            },
        };

        self.last_stop = Some(reason);
        Ok(reason)
    }

    fn classify_trap(&mut self, signal: Signal) -> Result<StopReason>
    {
        self.state = ExecutionState::StoppedOther(signal);

        let mut regs = self.tracee.read_registers()?;
        let pc = regs.pc();
        let hit = pc
            .checked_sub(self.options.trap.pc_offset())
            .filter(|addr| self.breakpoints.find(*addr).is_some_and(|bp| bp.is_enabled()));

        let Some(address) = hit else {
            tracing::trace!(pid = self.pid().0, pc = %pc, "Trap without breakpoint");
            return Ok(StopReason::Signal(signal, pc));
        };

        if let Some(breakpoint) = self.breakpoints.find_mut(address) {
            breakpoint.disable(&mut self.tracee)?;
        }

        regs.set_pc(address);
        if let Err(e) = self.tracee.write_registers(&regs) {
            // Put the trap back so the table still matches the code.
            if let Some(breakpoint) = self.breakpoints.find_mut(address) {
                if let Err(rearm) = breakpoint.enable(&mut self.tracee) {
                    tracing::warn!(address = %address, "Failed to re-arm breakpoint: {rearm}");
                }
            }
            return Err(e);
        }

        self.pending = Some(address);
        self.state = ExecutionState::StoppedAtBreakpoint(address);
        tracing::info!(pid = self.pid().0, address = %address, "Hit breakpoint");
        Ok(StopReason::Breakpoint(address))
    }

    /// Resume the target until its next stop.
    ///
    /// If a breakpoint is pending, its original instruction is executed with a
    /// single step first and the breakpoint is re-armed. Control comes back
    /// early (without resuming) if that step:
    ///
    /// - landed on another breakpoint, which then becomes the pending one
    /// - ended the session
    /// - stopped on any signal other than the plain trap
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`: the session cannot be driven
    /// - trace errors from the underlying primitives
    pub fn continue_execution(&mut self) -> Result<StopReason>
    {
        self.ensure_stopped()?;

        if let Some(reason) = self.step_over_pending()? {
            if !self.is_plain_step(reason) {
                return Ok(reason);
            }
        }

        let signal = self.deferred_signal.take();
        tracing::debug!(pid = self.pid().0, signal = ?signal, "Resuming target");
        if let Err(e) = self.tracee.resume(signal) {
            self.deferred_signal = signal;
            return Err(e);
        }
        self.state = ExecutionState::Running;
        self.wait_and_classify()
    }

    /// Execute a single instruction.
    ///
    /// On a pending breakpoint this is exactly the step-over preamble of
    /// [`continue_execution`](Self::continue_execution), reporting where that
    /// one step landed.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`: the session cannot be driven
    /// - trace errors from the underlying primitives
    pub fn step_into(&mut self) -> Result<StopReason>
    {
        self.ensure_stopped()?;

        let reason = match self.step_over_pending()? {
            Some(reason) => reason,
            None => self.single_step()?,
        };

        let reason = self.as_step(reason);
        self.last_stop = Some(reason);
        Ok(reason)
    }

    /// Continue until the target reaches `address`.
    ///
    /// A temporary breakpoint is placed at `address` if none exists there and
    /// removed after the stop, whatever caused it.
    ///
    /// ## Errors
    ///
    /// Same as [`continue_execution`](Self::continue_execution), plus trace
    /// errors from placing the temporary breakpoint.
    pub fn continue_until(&mut self, address: Address) -> Result<StopReason>
    {
        self.ensure_stopped()?;

        // Already sitting on it: the step-over will re-arm it anyway.
        let armed = if self.pending == Some(address) {
            SetBreakpointOutcome::AlreadyEnabled
        } else {
            self.breakpoints.set_or_enable(&mut self.tracee, address)?
        };

        let result = self.continue_execution();

        if armed != SetBreakpointOutcome::AlreadyEnabled {
            self.remove_temporary(address, armed);
        }
        result
    }

    /// Single-step until the program counter equals `address`.
    ///
    /// Stops early on anything but a plain step: a breakpoint, a signal or
    /// the end of the session.
    ///
    /// ## Errors
    ///
    /// Same as [`step_into`](Self::step_into).
    pub fn step_until(&mut self, address: Address) -> Result<StopReason>
    {
        loop {
            let reason = self.step_into()?;
            match reason {
                StopReason::Step(pc) if pc != address => continue,
                _ => return Ok(reason),
            }
        }
    }

    /// Kill the target and end the session.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - trace errors from the kill request; the session still ends
    pub fn kill_target(&mut self) -> Result<StopReason>
    {
        self.ensure_stopped()?;

        let result = self.tracee.kill();
        let reason = self.enter_terminal(StopReason::Killed);
        self.last_stop = Some(reason);
        result.map(|()| reason)
    }

    /// Restore all patched code, release the target and end the session.
    ///
    /// The process keeps running untraced.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - trace errors from restoring code or from the detach request
    pub fn detach_target(&mut self) -> Result<StopReason>
    {
        self.ensure_stopped()?;

        self.breakpoints.disable_all(&mut self.tracee)?;
        self.pending = None;
        self.tracee.detach()?;

        let reason = self.enter_terminal(StopReason::Detached);
        self.last_stop = Some(reason);
        Ok(reason)
    }

    /// Read the full register file.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - trace errors
    pub fn read_registers(&self) -> Result<Registers>
    {
        self.ensure_stopped()?;
        self.tracee.read_registers()
    }

    /// Overwrite one register.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - trace errors
    pub fn write_register(&mut self, id: RegisterId, value: u64) -> Result<()>
    {
        self.ensure_stopped()?;

        let mut regs = self.tracee.read_registers()?;
        regs.set(id, value);
        self.tracee.write_registers(&regs)?;
        tracing::debug!(register = id.name(), value = format_args!("{value:#x}"), "Register written");
        Ok(())
    }

    /// Current program counter.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - trace errors
    pub fn current_pc(&self) -> Result<Address>
    {
        Ok(self.read_registers()?.pc())
    }

    /// Read `len` bytes of target memory starting at `address`.
    ///
    /// Code under enabled breakpoints reads back as the trap opcode.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - `MemoryAccess`: the range is not readable
    pub fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        self.ensure_stopped()?;
        self.tracee.read_memory(address, len)
    }

    /// Place (or re-arm) a breakpoint at `address`.
    ///
    /// The pending breakpoint is lifted on purpose and will be re-armed by
    /// the next step, so it is reported as `AlreadyEnabled`.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - trace errors from patching; nothing is recorded in that case
    pub fn set_breakpoint(&mut self, address: Address) -> Result<SetBreakpointOutcome>
    {
        self.ensure_stopped()?;

        if self.pending == Some(address) {
            return Ok(SetBreakpointOutcome::AlreadyEnabled);
        }
        let outcome = self.breakpoints.set_or_enable(&mut self.tracee, address)?;
        tracing::info!(address = %address, outcome = ?outcome, "Breakpoint set");
        Ok(outcome)
    }

    /// Lift the breakpoint at `address`, keeping its record.
    ///
    /// If it is the pending breakpoint, no re-arm is owed any more.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - `NoSuchBreakpoint`
    /// - trace errors from restoring the code
    pub fn disable_breakpoint(&mut self, address: Address) -> Result<()>
    {
        self.ensure_stopped()?;

        self.breakpoints.disable(&mut self.tracee, address)?;
        if self.pending == Some(address) {
            self.pending = None;
        }
        tracing::info!(address = %address, "Breakpoint disabled");
        Ok(())
    }

    /// Remove the breakpoint at `address`, restoring its code first.
    ///
    /// ## Errors
    ///
    /// - `NotStarted` / `TargetTerminated`
    /// - `NoSuchBreakpoint` (nothing changes)
    /// - trace errors from restoring the code; the record is kept
    pub fn delete_breakpoint(&mut self, address: Address) -> Result<()>
    {
        self.ensure_stopped()?;

        self.breakpoints.delete(&mut self.tracee, address)?;
        if self.pending == Some(address) {
            self.pending = None;
        }
        tracing::info!(address = %address, "Breakpoint deleted");
        Ok(())
    }

    /// All breakpoints, address-sorted, with the pending one marked.
    #[must_use]
    pub fn breakpoints(&self) -> Vec<BreakpointInfo>
    {
        self.breakpoints.list(self.pending)
    }

    /// Single-step the pending breakpoint's instruction and re-arm it.
    ///
    /// Returns `None` when nothing was pending. If the step request itself
    /// fails the breakpoint stays pending and lifted, so the call can be
    /// retried. A failed re-arm is logged and does not hide the step result;
    /// the breakpoint goes back into the free slot for the next resume.
    fn step_over_pending(&mut self) -> Result<Option<StopReason>>
    {
        let Some(address) = self.pending else {
            return Ok(None);
        };

        tracing::debug!(address = %address, "Stepping over breakpoint");
        self.request_step()?;
        // A trap right after the step may claim the slot for another breakpoint.
        self.pending = None;
        let step = self.wait_and_classify();

        if self.tracee.is_active() {
            if let Some(breakpoint) = self.breakpoints.find_mut(address) {
                if let Err(e) = breakpoint.enable(&mut self.tracee) {
                    tracing::warn!(address = %address, "Failed to re-arm breakpoint after step: {e}");
                    // Retried by the next resume unless another breakpoint took the slot.
                    if self.pending.is_none() {
                        self.pending = Some(address);
                    }
                }
            }
        }

        step.map(Some)
    }

    fn single_step(&mut self) -> Result<StopReason>
    {
        self.request_step()?;
        self.wait_and_classify()
    }

    fn request_step(&mut self) -> Result<()>
    {
        let signal = self.deferred_signal.take();
        if let Err(e) = self.tracee.single_step(signal) {
            self.deferred_signal = signal;
            return Err(e);
        }
        self.state = ExecutionState::Running;
        Ok(())
    }

    fn wait_and_classify(&mut self) -> Result<StopReason>
    {
        let event = self.tracee.wait_for_stop()?;
        self.classify_stop(event)
    }

    /// Undo what `continue_until` armed: delete a breakpoint it created, lift
    /// one it re-enabled.
    fn remove_temporary(&mut self, address: Address, armed: SetBreakpointOutcome)
    {
        if !self.is_active() {
            return;
        }
        if self.pending == Some(address) {
            self.pending = None;
        }
        let result = match armed {
            SetBreakpointOutcome::Created => self.breakpoints.delete(&mut self.tracee, address),
            _ => self.breakpoints.disable(&mut self.tracee, address),
        };
        if let Err(e) = result {
            tracing::warn!(address = %address, "Failed to remove temporary breakpoint: {e}");
        }
    }

    /// A trap that was not a breakpoint is a completed step.
    fn as_step(&self, reason: StopReason) -> StopReason
    {
        match reason {
            StopReason::Signal(signal, pc) if signal == self.options.trap_signal => StopReason::Step(pc),
            other => other,
        }
    }

    fn is_plain_step(&self, reason: StopReason) -> bool
    {
        matches!(reason, StopReason::Signal(signal, _) if signal == self.options.trap_signal)
    }

    fn enter_terminal(&mut self, reason: StopReason) -> StopReason
    {
        tracing::info!(pid = self.pid().0, "{reason}");
        self.state = ExecutionState::Terminal(reason);
        self.pending = None;
        self.deferred_signal = None;
        reason
    }

    fn terminated(&self) -> DebuggerError
    {
        DebuggerError::TargetTerminated { pid: self.pid() }
    }

    fn ensure_stopped(&self) -> Result<()>
    {
        match self.state {
            ExecutionState::NotStarted => Err(DebuggerError::NotStarted),
            ExecutionState::Terminal(_) => Err(self.terminated()),
            _ if !self.tracee.is_active() => Err(self.terminated()),
            _ => Ok(()),
        }
    }
}
