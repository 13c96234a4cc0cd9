//! In-memory tracee shared by the integration tests
//!
//! `FakeTracee` keeps a byte-addressed code map and a register file, and
//! replays a script of stops: every `resume` / `single_step` consumes the next
//! scripted stop (moving the pc if the entry says so) and the following
//! `wait_for_stop` reports it. Every primitive call is journaled so tests can
//! check ordering, and any primitive can be made to fail once.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use stepwise_core::error::{DebuggerError, Result};
use stepwise_core::{Address, ProcessId, Registers, StopEvent, Tracee};

pub const FAKE_PID: i32 = 4242;

/// Kind of primitive, used for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op
{
    ReadWord,
    WriteWord,
    ReadRegs,
    WriteRegs,
    ReadMemory,
    Resume,
    Step,
    Wait,
    Kill,
    Detach,
}

/// One journaled primitive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call
{
    ReadWord(u64),
    WriteWord(u64, u64),
    ReadRegs,
    WriteRegs
    {
        pc: u64
    },
    ReadMemory(u64, usize),
    Resume(Option<Signal>),
    /// `byte_at_pc` is the code byte the step executes
    Step
    {
        pc: u64,
        byte_at_pc: Option<u8>,
        signal: Option<Signal>,
    },
    Wait,
    Kill,
    Detach,
}

/// What the next wait reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedStop
{
    pub event: StopEvent,
    pub pc: Option<u64>,
}

/// A `SIGTRAP` stop with the pc at `pc`.
pub fn trap_at(pc: u64) -> ScriptedStop
{
    ScriptedStop {
        event: StopEvent::Stopped(Signal::SIGTRAP),
        pc: Some(pc),
    }
}

/// A stop on `signal` with the pc at `pc`.
pub fn signal_at(signal: Signal, pc: u64) -> ScriptedStop
{
    ScriptedStop {
        event: StopEvent::Stopped(signal),
        pc: Some(pc),
    }
}

/// Normal process exit.
pub fn exited(code: i32) -> ScriptedStop
{
    ScriptedStop {
        event: StopEvent::Exited(code),
        pc: None,
    }
}

#[derive(Debug)]
pub struct FakeTracee
{
    pid: ProcessId,
    active: bool,
    memory: BTreeMap<u64, u8>,
    regs: Registers,
    script: VecDeque<ScriptedStop>,
    in_flight: Option<ScriptedStop>,
    journal: RefCell<Vec<Call>>,
    failures: RefCell<Vec<Op>>,
}

impl FakeTracee
{
    pub fn new() -> Self
    {
        Self {
            pid: ProcessId::from(FAKE_PID),
            active: true,
            memory: BTreeMap::new(),
            regs: Registers::new(),
            script: VecDeque::new(),
            in_flight: None,
            journal: RefCell::new(Vec::new()),
            failures: RefCell::new(Vec::new()),
        }
    }

    /// Map `bytes` of code starting at `addr`.
    pub fn with_code(mut self, addr: u64, bytes: &[u8]) -> Self
    {
        self.load(addr, bytes);
        self
    }

    /// Queue stops, in order.
    pub fn with_script(mut self, stops: impl IntoIterator<Item = ScriptedStop>) -> Self
    {
        self.script.extend(stops);
        self
    }

    pub fn load(&mut self, addr: u64, bytes: &[u8])
    {
        for (offset, byte) in bytes.iter().enumerate() {
            self.memory.insert(addr + offset as u64, *byte);
        }
    }

    pub fn byte(&self, addr: u64) -> Option<u8>
    {
        self.memory.get(&addr).copied()
    }

    pub fn regs(&self) -> Registers
    {
        self.regs
    }

    pub fn set_pc(&mut self, pc: u64)
    {
        self.regs.set_pc(Address::from(pc));
    }

    /// Make the next call of `op` fail with `EIO`.
    pub fn fail_once(&self, op: Op)
    {
        self.failures.borrow_mut().push(op);
    }

    pub fn journal(&self) -> Vec<Call>
    {
        self.journal.borrow().clone()
    }

    pub fn clear_journal(&self)
    {
        self.journal.borrow_mut().clear();
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize
    {
        self.journal.borrow().iter().filter(|call| matches(call)).count()
    }

    pub fn position(&self, matches: impl Fn(&Call) -> bool) -> Option<usize>
    {
        self.journal.borrow().iter().position(|call| matches(call))
    }

    fn record(&self, call: Call)
    {
        self.journal.borrow_mut().push(call);
    }

    fn check(&self, op: Op, name: &'static str) -> Result<()>
    {
        if !self.active {
            return Err(DebuggerError::TargetTerminated { pid: self.pid });
        }
        let mut failures = self.failures.borrow_mut();
        if let Some(index) = failures.iter().position(|f| *f == op) {
            failures.remove(index);
            return Err(DebuggerError::trace(name, self.pid, Errno::EIO));
        }
        Ok(())
    }

    fn word_at(&self, addr: u64) -> Option<u64>
    {
        let mut bytes = [0u8; 8];
        for (offset, slot) in bytes.iter_mut().enumerate() {
            *slot = self.byte(addr + offset as u64)?;
        }
        Some(u64::from_le_bytes(bytes))
    }

    fn launch_next(&mut self)
    {
        let next = self.script.pop_front().unwrap_or_else(|| exited(0));
        self.in_flight = Some(next);
    }
}

impl Tracee for FakeTracee
{
    fn pid(&self) -> ProcessId
    {
        self.pid
    }

    fn is_active(&self) -> bool
    {
        self.active
    }

    fn read_instruction_word(&self, addr: Address) -> Result<u64>
    {
        self.check(Op::ReadWord, "PTRACE_PEEKTEXT")?;
        self.record(Call::ReadWord(addr.value()));
        self.word_at(addr.value())
            .ok_or_else(|| DebuggerError::trace("PTRACE_PEEKTEXT", self.pid, Errno::EIO))
    }

    fn write_instruction_word(&mut self, addr: Address, word: u64) -> Result<()>
    {
        self.check(Op::WriteWord, "PTRACE_POKETEXT")?;
        self.record(Call::WriteWord(addr.value(), word));
        let bytes = word.to_le_bytes();
        self.load(addr.value(), &bytes);
        Ok(())
    }

    fn read_registers(&self) -> Result<Registers>
    {
        self.check(Op::ReadRegs, "PTRACE_GETREGS")?;
        self.record(Call::ReadRegs);
        Ok(self.regs)
    }

    fn write_registers(&mut self, regs: &Registers) -> Result<()>
    {
        self.check(Op::WriteRegs, "PTRACE_SETREGS")?;
        self.record(Call::WriteRegs { pc: regs.pc().value() });
        self.regs = *regs;
        Ok(())
    }

    fn read_memory(&self, addr: Address, len: usize) -> Result<Vec<u8>>
    {
        self.check(Op::ReadMemory, "PTRACE_PEEKDATA")?;
        self.record(Call::ReadMemory(addr.value(), len));
        (0..len as u64)
            .map(|offset| self.byte(addr.value() + offset))
            .collect::<Option<Vec<u8>>>()
            .ok_or(DebuggerError::MemoryAccess {
                address: addr,
                len,
                pid: self.pid,
            })
    }

    fn resume(&mut self, signal: Option<Signal>) -> Result<()>
    {
        self.check(Op::Resume, "PTRACE_CONT")?;
        self.record(Call::Resume(signal));
        self.launch_next();
        Ok(())
    }

    fn single_step(&mut self, signal: Option<Signal>) -> Result<()>
    {
        self.check(Op::Step, "PTRACE_SINGLESTEP")?;
        let pc = self.regs.pc().value();
        self.record(Call::Step {
            pc,
            byte_at_pc: self.byte(pc),
            signal,
        });
        self.launch_next();
        Ok(())
    }

    fn kill(&mut self) -> Result<()>
    {
        self.check(Op::Kill, "kill")?;
        self.record(Call::Kill);
        self.active = false;
        Ok(())
    }

    fn detach(&mut self) -> Result<()>
    {
        self.check(Op::Detach, "PTRACE_DETACH")?;
        self.record(Call::Detach);
        self.active = false;
        Ok(())
    }

    fn wait_for_stop(&mut self) -> Result<StopEvent>
    {
        self.check(Op::Wait, "waitpid")?;
        self.record(Call::Wait);

        let stop = match self.in_flight.take() {
            Some(stop) => stop,
            None => self.script.pop_front().unwrap_or_else(|| exited(0)),
        };
        if let Some(pc) = stop.pc {
            self.set_pc(pc);
        }
        if stop.event.is_terminal() {
            self.active = false;
        }
        Ok(stop.event)
    }
}
