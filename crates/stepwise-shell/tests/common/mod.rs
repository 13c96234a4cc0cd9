//! Minimal in-memory tracee for driving the shell in tests
//!
//! Memory is a sparse byte map, the register file is a plain snapshot and
//! every wait pops the next scripted event (`Exited(0)` once the script runs
//! out).

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use nix::sys::signal::Signal;
use stepwise_core::error::{DebuggerError, Result};
use stepwise_core::{Address, ControllerOptions, ExecutionController, ProcessId, Registers, StopEvent, Tracee};

pub const STUB_PID: i32 = 777;
pub const ENTRY: u64 = 0x40_1000;

#[derive(Debug, Default)]
pub struct StubTracee
{
    pub memory: HashMap<u64, u8>,
    pub regs: Registers,
    pub events: VecDeque<StopEvent>,
    pub active: bool,
    pub killed: bool,
    pub detached: bool,
}

impl StubTracee
{
    pub fn new(code: &[u8]) -> Self
    {
        let mut stub = Self {
            active: true,
            ..Self::default()
        };
        for (offset, byte) in code.iter().enumerate() {
            stub.memory.insert(ENTRY + offset as u64, *byte);
        }
        stub.regs.set_pc(Address::from(ENTRY));
        stub.events.push_back(StopEvent::Stopped(Signal::SIGTRAP));
        stub
    }

    fn byte(&self, addr: u64, len: usize) -> Result<u8>
    {
        self.memory.get(&addr).copied().ok_or(DebuggerError::MemoryAccess {
            address: Address::from(addr),
            len,
            pid: self.pid(),
        })
    }
}

impl Tracee for StubTracee
{
    fn pid(&self) -> ProcessId
    {
        ProcessId::from(STUB_PID)
    }

    fn is_active(&self) -> bool
    {
        self.active
    }

    fn read_instruction_word(&self, addr: Address) -> Result<u64>
    {
        let mut bytes = [0u8; 8];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = self.byte(addr.value() + i as u64, 8)?;
        }
        Ok(u64::from_le_bytes(bytes))
    }

    fn write_instruction_word(&mut self, addr: Address, word: u64) -> Result<()>
    {
        for (i, byte) in word.to_le_bytes().into_iter().enumerate() {
            self.memory.insert(addr.value() + i as u64, byte);
        }
        Ok(())
    }

    fn read_registers(&self) -> Result<Registers>
    {
        Ok(self.regs)
    }

    fn write_registers(&mut self, regs: &Registers) -> Result<()>
    {
        self.regs = *regs;
        Ok(())
    }

    fn read_memory(&self, addr: Address, len: usize) -> Result<Vec<u8>>
    {
        (0..len).map(|i| self.byte(addr.value() + i as u64, len)).collect()
    }

    fn resume(&mut self, _signal: Option<Signal>) -> Result<()>
    {
        Ok(())
    }

    fn single_step(&mut self, _signal: Option<Signal>) -> Result<()>
    {
        Ok(())
    }

    fn kill(&mut self) -> Result<()>
    {
        self.active = false;
        self.killed = true;
        Ok(())
    }

    fn detach(&mut self) -> Result<()>
    {
        self.active = false;
        self.detached = true;
        Ok(())
    }

    fn wait_for_stop(&mut self) -> Result<StopEvent>
    {
        let event = self.events.pop_front().unwrap_or(StopEvent::Exited(0));
        if event.is_terminal() {
            self.active = false;
        }
        Ok(event)
    }
}

/// A started controller over `code` placed at [`ENTRY`].
pub fn started(code: &[u8]) -> ExecutionController<StubTracee>
{
    let mut controller = ExecutionController::new(StubTracee::new(code), ControllerOptions::default());
    controller.start().unwrap();
    controller
}
