//! CPU register types and access.

use std::fmt;

use super::Address;

/// Identifier for a specific CPU register
///
/// The register file is flat: program counter, stack pointer, frame pointer,
/// flags and the remaining general-purpose registers. This is the "symbolic
/// register code" the controller's `write_register` accepts.
///
/// ## Example
///
/// ```rust
/// use stepwise_core::types::{RegisterId, X86_64Register};
///
/// let pc = RegisterId::Pc;
/// let rax = RegisterId::General(X86_64Register::Rax);
/// assert_eq!(pc.name(), "rip");
/// assert_eq!(rax.name(), "rax");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterId
{
    /// Program Counter (RIP) - points to the next instruction to execute
    Pc,
    /// Stack Pointer (RSP) - points to the top of the stack
    Sp,
    /// Frame Pointer (RBP) - points to the current stack frame
    Fp,
    /// Status/Flags register (EFLAGS)
    Status,
    /// Any other general-purpose register
    General(X86_64Register),
}

impl RegisterId
{
    /// Every register in dump order.
    pub const ALL: [RegisterId; 18] = [
        RegisterId::General(X86_64Register::Rax),
        RegisterId::General(X86_64Register::Rbx),
        RegisterId::General(X86_64Register::Rcx),
        RegisterId::General(X86_64Register::Rdx),
        RegisterId::General(X86_64Register::Rsi),
        RegisterId::General(X86_64Register::Rdi),
        RegisterId::Fp,
        RegisterId::Sp,
        RegisterId::General(X86_64Register::R8),
        RegisterId::General(X86_64Register::R9),
        RegisterId::General(X86_64Register::R10),
        RegisterId::General(X86_64Register::R11),
        RegisterId::General(X86_64Register::R12),
        RegisterId::General(X86_64Register::R13),
        RegisterId::General(X86_64Register::R14),
        RegisterId::General(X86_64Register::R15),
        RegisterId::Pc,
        RegisterId::Status,
    ];

    /// Canonical lower-case name of the register.
    #[must_use]
    pub const fn name(self) -> &'static str
    {
        match self {
            RegisterId::Pc => "rip",
            RegisterId::Sp => "rsp",
            RegisterId::Fp => "rbp",
            RegisterId::Status => "eflags",
            RegisterId::General(reg) => reg.name(),
        }
    }
}

impl fmt::Display for RegisterId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

/// x86-64 general-purpose register identifier
///
/// RSP, RBP and RIP are not listed here; they are reached via
/// `RegisterId::Sp`, `RegisterId::Fp` and `RegisterId::Pc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum X86_64Register
{
    /// RAX - Accumulator register (often used for return values)
    Rax,
    /// RBX - Base register
    Rbx,
    /// RCX - Counter register
    Rcx,
    /// RDX - Data register
    Rdx,
    /// RSI - Source index register
    Rsi,
    /// RDI - Destination index register
    Rdi,
    /// R8 - General-purpose register
    R8,
    /// R9 - General-purpose register
    R9,
    /// R10 - General-purpose register
    R10,
    /// R11 - General-purpose register
    R11,
    /// R12 - General-purpose register
    R12,
    /// R13 - General-purpose register
    R13,
    /// R14 - General-purpose register
    R14,
    /// R15 - General-purpose register
    R15,
}

impl X86_64Register
{
    /// Number of registers stored in [`Registers::general`].
    pub const COUNT: usize = 14;

    /// Position of this register in [`Registers::general`].
    #[must_use]
    pub const fn index(self) -> usize
    {
        self as usize
    }

    /// Lower-case register name.
    #[must_use]
    pub const fn name(self) -> &'static str
    {
        match self {
            X86_64Register::Rax => "rax",
            X86_64Register::Rbx => "rbx",
            X86_64Register::Rcx => "rcx",
            X86_64Register::Rdx => "rdx",
            X86_64Register::Rsi => "rsi",
            X86_64Register::Rdi => "rdi",
            X86_64Register::R8 => "r8",
            X86_64Register::R9 => "r9",
            X86_64Register::R10 => "r10",
            X86_64Register::R11 => "r11",
            X86_64Register::R12 => "r12",
            X86_64Register::R13 => "r13",
            X86_64Register::R14 => "r14",
            X86_64Register::R15 => "r15",
        }
    }
}

/// Snapshot of the target's register file
///
/// Read and written as a whole against the traced process. Modifying a
/// snapshot has no effect on the target until it is handed back through
/// `write_registers`.
///
/// ## Example
///
/// ```rust
/// use stepwise_core::types::{Address, RegisterId, Registers, X86_64Register};
///
/// let mut regs = Registers::new();
/// regs.set(RegisterId::General(X86_64Register::Rax), 0x1234);
/// regs.set_pc(Address::from(0x401000));
/// assert_eq!(regs.get(RegisterId::General(X86_64Register::Rax)), 0x1234);
/// assert_eq!(regs.get(RegisterId::Pc), 0x401000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers
{
    /// Program Counter (RIP) - address of the next instruction to execute
    pub pc: Address,
    /// Stack Pointer (RSP) - address of the top of the stack
    pub sp: Address,
    /// Frame Pointer (RBP) - address of the current stack frame
    pub fp: Address,
    /// Status/Flags register (EFLAGS)
    pub status: u64,
    /// RAX, RBX, RCX, RDX, RSI, RDI, R8-R15, indexed by [`X86_64Register::index`]
    pub general: [u64; X86_64Register::COUNT],
}

impl Registers
{
    /// Create a zeroed register set
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Get the value of a register by its identifier
    #[must_use]
    pub fn get(&self, id: RegisterId) -> u64
    {
        match id {
            RegisterId::Pc => self.pc.value(),
            RegisterId::Sp => self.sp.value(),
            RegisterId::Fp => self.fp.value(),
            RegisterId::Status => self.status,
            RegisterId::General(reg) => self.general[reg.index()],
        }
    }

    /// Set the value of a register by its identifier
    pub fn set(&mut self, id: RegisterId, value: u64)
    {
        match id {
            RegisterId::Pc => self.pc = Address::from(value),
            RegisterId::Sp => self.sp = Address::from(value),
            RegisterId::Fp => self.fp = Address::from(value),
            RegisterId::Status => self.status = value,
            RegisterId::General(reg) => self.general[reg.index()] = value,
        }
    }

    /// Current program counter.
    #[must_use]
    pub fn pc(&self) -> Address
    {
        self.pc
    }

    /// Move the program counter.
    pub fn set_pc(&mut self, pc: Address)
    {
        self.pc = pc;
    }

    /// Iterate over every register in dump order.
    pub fn iter(&self) -> impl Iterator<Item = (RegisterId, u64)> + '_
    {
        RegisterId::ALL.iter().map(move |&id| (id, self.get(id)))
    }
}
