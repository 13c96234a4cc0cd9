//! Address-indexed breakpoint table.

use std::collections::BTreeMap;

use super::{Breakpoint, BreakpointInfo, SetBreakpointOutcome};
use crate::arch::TrapInstruction;
use crate::error::{DebuggerError, Result};
use crate::tracee::Tracee;
use crate::types::Address;

/// Mapping from address to [`Breakpoint`]
///
/// At most one record exists per address. Lookups are `O(log n)` and
/// enumeration is address-sorted, so `list()` output is deterministic.
#[derive(Debug, Default)]
pub struct BreakpointTable
{
    trap: TrapInstruction,
    by_address: BTreeMap<Address, Breakpoint>,
}

impl BreakpointTable
{
    /// Create an empty table whose breakpoints patch in `trap`.
    #[must_use]
    pub fn new(trap: TrapInstruction) -> Self
    {
        Self {
            trap,
            by_address: BTreeMap::new(),
        }
    }

    /// Trap instruction used for every record in this table.
    #[must_use]
    pub fn trap(&self) -> TrapInstruction
    {
        self.trap
    }

    /// Number of records (enabled or not).
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.by_address.len()
    }

    /// Whether the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.by_address.is_empty()
    }

    /// Create and arm a breakpoint at `address`, or re-arm an existing one.
    ///
    /// - no record: a new one is created and enabled; it is only inserted
    ///   once the patch actually took effect
    /// - disabled record: it is enabled again, saving the byte currently in
    ///   the code (which is the restored original, never the trap opcode)
    /// - enabled record: benign duplicate, reported as `AlreadyEnabled`
    ///
    /// ## Errors
    ///
    /// The trace error from reading or patching the code. The table is left
    /// exactly as it was.
    pub fn set_or_enable<T: Tracee + ?Sized>(&mut self, tracee: &mut T, address: Address)
        -> Result<SetBreakpointOutcome>
    {
        if let Some(existing) = self.by_address.get_mut(&address) {
            if existing.is_enabled() {
                return Ok(SetBreakpointOutcome::AlreadyEnabled);
            }
            existing.enable(tracee)?;
            return Ok(SetBreakpointOutcome::Reenabled);
        }

        let mut breakpoint = Breakpoint::new(tracee.pid(), address, self.trap);
        breakpoint.enable(tracee)?;
        self.by_address.insert(address, breakpoint);
        Ok(SetBreakpointOutcome::Created)
    }

    /// Remove the patch at `address` but keep the record.
    ///
    /// ## Errors
    ///
    /// - `NoSuchBreakpoint`: nothing is registered at `address`
    /// - trace errors from restoring the code (record stays enabled)
    pub fn disable<T: Tracee + ?Sized>(&mut self, tracee: &mut T, address: Address) -> Result<()>
    {
        self.by_address
            .get_mut(&address)
            .ok_or(DebuggerError::NoSuchBreakpoint(address))?
            .disable(tracee)
    }

    /// Restore the code at `address` if needed, then forget the record.
    ///
    /// ## Errors
    ///
    /// - `NoSuchBreakpoint`: nothing is registered at `address`; no side effect
    /// - trace errors from restoring the code; the record is kept so the
    ///   patched byte is never orphaned
    pub fn delete<T: Tracee + ?Sized>(&mut self, tracee: &mut T, address: Address) -> Result<()>
    {
        self.disable(tracee, address)?;
        self.by_address.remove(&address);
        Ok(())
    }

    /// Restore the original code under every enabled breakpoint.
    ///
    /// Every record is attempted even if one fails; the first error is
    /// returned.
    pub fn disable_all<T: Tracee + ?Sized>(&mut self, tracee: &mut T) -> Result<()>
    {
        let mut first_error = None;
        for breakpoint in self.by_address.values_mut() {
            if let Err(e) = breakpoint.disable(tracee) {
                tracing::warn!(address = %breakpoint.address(), "Failed to restore code under breakpoint: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Look up the record at `address`.
    #[must_use]
    pub fn find(&self, address: Address) -> Option<&Breakpoint>
    {
        self.by_address.get(&address)
    }

    /// Look up the record at `address` for modification.
    pub fn find_mut(&mut self, address: Address) -> Option<&mut Breakpoint>
    {
        self.by_address.get_mut(&address)
    }

    /// Enumerate every record in address order.
    ///
    /// `pending` marks the breakpoint (if any) that is lifted waiting for its
    /// step-over.
    #[must_use]
    pub fn list(&self, pending: Option<Address>) -> Vec<BreakpointInfo>
    {
        self.by_address
            .values()
            .map(|bp| bp.info(pending == Some(bp.address())))
            .collect()
    }
}
