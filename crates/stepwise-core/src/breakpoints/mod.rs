//! Software breakpoint records and bookkeeping.
//!
//! A [`Breakpoint`] is the patch record for one address: it knows the byte it
//! displaced and how to swap the trap opcode in and out of the target's code.
//! [`BreakpointTable`] indexes those records by address.
//!
//! Neither type decides *when* to patch; that belongs to the execution
//! controller, which owns the only copy of the table.

mod table;

pub use table::BreakpointTable;

use crate::arch::TrapInstruction;
use crate::error::Result;
use crate::tracee::Tracee;
use crate::types::{Address, ProcessId};

/// A software breakpoint at a single address
///
/// ## Invariant
///
/// `saved_instruction` is only meaningful while `enabled` is true. The flag is
/// cleared only after the saved byte has been written back, so a failed
/// restore leaves the record enabled and the restore can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint
{
    pid: ProcessId,
    address: Address,
    enabled: bool,
    saved_instruction: u8,
    trap: TrapInstruction,
}

impl Breakpoint
{
    /// Create a disabled breakpoint record for `address` in process `pid`.
    #[must_use]
    pub fn new(pid: ProcessId, address: Address, trap: TrapInstruction) -> Self
    {
        Self {
            pid,
            address,
            enabled: false,
            saved_instruction: 0,
            trap,
        }
    }

    /// Process whose code this breakpoint patches.
    #[must_use]
    pub fn pid(&self) -> ProcessId
    {
        self.pid
    }

    /// Patched address.
    #[must_use]
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Whether the trap opcode is currently written into the target.
    #[must_use]
    pub fn is_enabled(&self) -> bool
    {
        self.enabled
    }

    /// The original byte displaced by the trap, while enabled.
    #[must_use]
    pub fn saved_instruction(&self) -> Option<u8>
    {
        self.enabled.then_some(self.saved_instruction)
    }

    /// Write the trap opcode over the byte at this breakpoint's address.
    ///
    /// Does nothing (and issues no write) if the breakpoint is already
    /// enabled.
    ///
    /// ## Errors
    ///
    /// Returns the trace error if either the read or the write fails. In that
    /// case nothing changed: the record stays disabled and the caller must
    /// not assume the patch took effect.
    pub fn enable<T: Tracee + ?Sized>(&mut self, tracee: &mut T) -> Result<()>
    {
        if self.enabled {
            return Ok(());
        }

        let word = tracee.read_instruction_word(self.address)?;
        let (patched, saved) = self.trap.patch(word);
        tracee.write_instruction_word(self.address, patched)?;

        self.saved_instruction = saved;
        self.enabled = true;
        tracing::debug!(
            pid = self.pid.0,
            address = %self.address,
            saved = format_args!("{saved:#04x}"),
            "Breakpoint patched in"
        );
        Ok(())
    }

    /// Restore the original byte at this breakpoint's address.
    ///
    /// Does nothing if the breakpoint is already disabled.
    ///
    /// ## Errors
    ///
    /// Returns the trace error if the restore could not be completed. The
    /// record stays enabled so a later retry still knows the original byte.
    pub fn disable<T: Tracee + ?Sized>(&mut self, tracee: &mut T) -> Result<()>
    {
        if !self.enabled {
            return Ok(());
        }

        let word = tracee.read_instruction_word(self.address)?;
        let restored = self.trap.restore(word, self.saved_instruction);
        tracee.write_instruction_word(self.address, restored)?;

        self.enabled = false;
        tracing::debug!(pid = self.pid.0, address = %self.address, "Breakpoint patch removed");
        Ok(())
    }

    /// Public view of this record.
    #[must_use]
    pub fn info(&self, pending: bool) -> BreakpointInfo
    {
        BreakpointInfo {
            address: self.address,
            enabled: self.enabled,
            pending,
        }
    }
}

/// Row describing one breakpoint, as handed to the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointInfo
{
    /// The memory address where the breakpoint is placed.
    pub address: Address,
    /// Whether the trap opcode is currently in the target's code.
    pub enabled: bool,
    /// Whether this breakpoint has just fired and is temporarily lifted,
    /// owed a re-arm after the next single step.
    pub pending: bool,
}

/// What `set_or_enable` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetBreakpointOutcome
{
    /// A new breakpoint was created and armed.
    Created,
    /// An existing, disabled breakpoint was armed again.
    Reenabled,
    /// The breakpoint was already armed; nothing was written.
    AlreadyEnabled,
}
