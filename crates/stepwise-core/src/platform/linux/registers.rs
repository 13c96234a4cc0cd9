//! # Linux Register Access
//!
//! Conversion between the kernel's `user_regs_struct` and [`Registers`].
//!
//! `PTRACE_GETREGS` / `PTRACE_SETREGS` move the whole structure at once.
//! The structure also carries segment registers, `orig_rax` and the FS/GS
//! bases, which [`Registers`] does not model. Writing therefore always
//! starts from a fresh `PTRACE_GETREGS` and only overwrites the fields we
//! know, so those extra fields are never clobbered.
//!
//! ## References
//!
//! - [ptrace(2) man page](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//! - `struct user_regs_struct` in `<sys/user.h>`

use libc::user_regs_struct;

use crate::types::{Address, Registers, X86_64Register};

/// Build a [`Registers`] snapshot from the kernel structure.
pub(crate) fn from_user_regs(raw: &user_regs_struct) -> Registers
{
    let mut regs = Registers::new();
    regs.pc = Address::from(raw.rip);
    regs.sp = Address::from(raw.rsp);
    regs.fp = Address::from(raw.rbp);
    regs.status = raw.eflags;

    let mut scratch = *raw;
    for reg in GENERAL {
        regs.general[reg.index()] = *general_field(&mut scratch, reg);
    }
    regs
}

/// Copy `regs` over the fields of `raw` that [`Registers`] models.
pub(crate) fn apply_to_user_regs(regs: &Registers, raw: &mut user_regs_struct)
{
    raw.rip = regs.pc.value();
    raw.rsp = regs.sp.value();
    raw.rbp = regs.fp.value();
    raw.eflags = regs.status;

    for reg in GENERAL {
        *general_field(raw, reg) = regs.general[reg.index()];
    }
}

const GENERAL: [X86_64Register; X86_64Register::COUNT] = [
    X86_64Register::Rax,
    X86_64Register::Rbx,
    X86_64Register::Rcx,
    X86_64Register::Rdx,
    X86_64Register::Rsi,
    X86_64Register::Rdi,
    X86_64Register::R8,
    X86_64Register::R9,
    X86_64Register::R10,
    X86_64Register::R11,
    X86_64Register::R12,
    X86_64Register::R13,
    X86_64Register::R14,
    X86_64Register::R15,
];

fn general_field(raw: &mut user_regs_struct, reg: X86_64Register) -> &mut u64
{
    match reg {
        X86_64Register::Rax => &mut raw.rax,
        X86_64Register::Rbx => &mut raw.rbx,
        X86_64Register::Rcx => &mut raw.rcx,
        X86_64Register::Rdx => &mut raw.rdx,
        X86_64Register::Rsi => &mut raw.rsi,
        X86_64Register::Rdi => &mut raw.rdi,
        X86_64Register::R8 => &mut raw.r8,
        X86_64Register::R9 => &mut raw.r9,
        X86_64Register::R10 => &mut raw.r10,
        X86_64Register::R11 => &mut raw.r11,
        X86_64Register::R12 => &mut raw.r12,
        X86_64Register::R13 => &mut raw.r13,
        X86_64Register::R14 => &mut raw.r14,
        X86_64Register::R15 => &mut raw.r15,
    }
}
