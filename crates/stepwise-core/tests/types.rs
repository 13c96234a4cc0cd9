//! Tests for platform-agnostic types

use nix::sys::signal::Signal;
use stepwise_core::types::{Address, ProcessId, RegisterId, Registers, StopEvent, StopReason, X86_64Register};

#[test]
fn test_process_id_from_i32()
{
    let pid = ProcessId::from(12345);
    assert_eq!(pid.0, 12345);
    let value: i32 = pid.into();
    assert_eq!(value, 12345);
}

#[test]
fn test_process_id_equality()
{
    let pid1 = ProcessId::from(12345);
    let pid2 = ProcessId::from(12345);
    let pid3 = ProcessId::from(54321);

    assert_eq!(pid1, pid2);
    assert_ne!(pid1, pid3);
}

#[test]
fn test_address_display_is_zero_padded()
{
    assert_eq!(Address::from(0x401000).to_string(), "0x0000000000401000");
}

#[test]
fn test_address_arithmetic()
{
    let addr = Address::from(0x1001);
    assert_eq!(addr.checked_sub(1), Some(Address::from(0x1000)));
    assert_eq!(Address::from(0).checked_sub(1), None);
    assert_eq!(Address::from(u64::MAX).checked_add(1), None);
    assert_eq!(addr.align_down(8), Address::from(0x1000));
}

#[test]
fn test_registers_new()
{
    let regs = Registers::new();
    assert_eq!(regs.pc, Address::from(0));
    assert_eq!(regs.sp, Address::from(0));
    assert_eq!(regs.status, 0);
    assert!(regs.general.iter().all(|v| *v == 0));
}

#[test]
fn test_registers_get_set_by_id()
{
    let mut regs = Registers::new();
    for (i, id) in RegisterId::ALL.iter().enumerate() {
        regs.set(*id, i as u64 + 1);
    }
    for (i, id) in RegisterId::ALL.iter().enumerate() {
        assert_eq!(regs.get(*id), i as u64 + 1, "register {id}");
    }
    assert_eq!(regs.pc().value(), regs.get(RegisterId::Pc));
}

#[test]
fn test_register_dump_order()
{
    let names: Vec<&str> = RegisterId::ALL.iter().map(|id| id.name()).collect();
    assert_eq!(names.first(), Some(&"rax"));
    assert_eq!(names[6], "rbp");
    assert_eq!(names[7], "rsp");
    assert_eq!(names[16], "rip");
    assert_eq!(names.last(), Some(&"eflags"));
    assert_eq!(RegisterId::General(X86_64Register::R12).name(), "r12");
}

#[test]
fn test_stop_event_terminal()
{
    assert!(StopEvent::Exited(0).is_terminal());
    assert!(StopEvent::Signaled(Signal::SIGKILL).is_terminal());
    assert!(!StopEvent::Stopped(Signal::SIGTRAP).is_terminal());
}

#[test]
fn test_stop_reason_location()
{
    let at = Address::from(0x2000);
    assert_eq!(StopReason::Breakpoint(at).location(), Some(at));
    assert_eq!(StopReason::Signal(Signal::SIGUSR1, at).location(), Some(at));
    assert_eq!(StopReason::Exited(0).location(), None);
    assert!(StopReason::Faulted(Signal::SIGSEGV).is_terminal());
    assert!(!StopReason::Step(at).is_terminal());
}

#[test]
fn test_stop_reason_display()
{
    assert_eq!(StopReason::Exited(3).to_string(), "Process exited with code: 3");
    assert!(StopReason::Breakpoint(Address::from(0x2000))
        .to_string()
        .contains("0x0000000000002000"));
}
