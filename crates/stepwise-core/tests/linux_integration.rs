//! Integration tests for the Linux ptrace backend
//!
//! These tests require:
//! - Running on x86-64 Linux (`#[cfg(all(target_os = "linux", target_arch = "x86_64"))]`)
//! - ptrace being permitted (containers with a restrictive seccomp profile
//!   refuse it; the tests then skip instead of failing)
//! - `/bin/true` and `/bin/sleep`

#![cfg(all(target_os = "linux", target_arch = "x86_64"))]

use std::path::Path;
use std::process::{Command, Stdio};

use nix::sys::signal::Signal;
use stepwise_core::error::DebuggerError;
use stepwise_core::platform::linux::{LaunchOptions, Origin, TargetProcess};
use stepwise_core::{ControllerOptions, ExecutionController, ProcessId, StopReason, Tracee};

/// Launch `/bin/true`, or `None` if this environment forbids tracing.
fn launch_true(options: &LaunchOptions) -> Option<ExecutionController<TargetProcess>>
{
    match TargetProcess::launch(Path::new("/bin/true"), &[], options) {
        Ok(target) => Some(ExecutionController::new(target, ControllerOptions::default())),
        Err(DebuggerError::LaunchFailed(reason)) => {
            eprintln!("skipping: cannot trace here ({reason})");
            None
        },
        Err(e) => panic!("unexpected launch error: {e}"),
    }
}

#[test]
fn test_launch_runs_to_exit()
{
    let Some(mut controller) = launch_true(&LaunchOptions::default()) else {
        return;
    };
    assert_eq!(controller.tracee().origin(), Origin::Launched);

    let initial = controller.start().unwrap();
    assert!(matches!(initial, StopReason::Signal(Signal::SIGTRAP, _)));

    assert_eq!(controller.continue_execution().unwrap(), StopReason::Exited(0));
    assert!(!controller.is_active());
    assert!(matches!(
        controller.read_registers(),
        Err(DebuggerError::TargetTerminated { .. })
    ));
}

#[test]
fn test_breakpoint_at_entry_is_hit_and_stepped_over()
{
    let Some(mut controller) = launch_true(&LaunchOptions { disable_aslr: true }) else {
        return;
    };
    controller.start().unwrap();
    let entry = controller.current_pc().unwrap();
    let original = controller.read_memory(entry, 1).unwrap();

    controller.set_breakpoint(entry).unwrap();
    assert_eq!(controller.read_memory(entry, 1).unwrap(), vec![0xCC]);

    // The trap sits right under the pc, so the very first instruction hits it.
    assert_eq!(controller.continue_execution().unwrap(), StopReason::Breakpoint(entry));
    assert_eq!(controller.current_pc().unwrap(), entry);
    assert_eq!(controller.read_memory(entry, 1).unwrap(), original);

    assert_eq!(controller.continue_execution().unwrap(), StopReason::Exited(0));
}

#[test]
fn test_single_step_advances_pc()
{
    let Some(mut controller) = launch_true(&LaunchOptions::default()) else {
        return;
    };
    controller.start().unwrap();
    let before = controller.current_pc().unwrap();

    let StopReason::Step(after) = controller.step_into().unwrap() else {
        panic!("expected a plain step");
    };
    assert_ne!(before, after);
    controller.kill_target().unwrap();
}

#[test]
fn test_read_memory_unaligned_and_empty()
{
    let Some(mut controller) = launch_true(&LaunchOptions::default()) else {
        return;
    };
    controller.start().unwrap();
    let pc = controller.current_pc().unwrap();

    let wide = controller.read_memory(pc, 24).unwrap();
    let shifted = controller.read_memory(pc.checked_add(3).unwrap(), 13).unwrap();
    assert_eq!(&wide[3..16], shifted.as_slice());
    assert!(controller.read_memory(pc, 0).unwrap().is_empty());
}

#[test]
fn test_read_memory_rejects_oversized_ranges()
{
    let Some(mut controller) = launch_true(&LaunchOptions::default()) else {
        return;
    };
    controller.start().unwrap();
    let pc = controller.current_pc().unwrap();

    let past_end = controller.read_memory(pc.checked_add(1).unwrap(), usize::MAX);
    assert!(matches!(past_end, Err(DebuggerError::MemoryAccess { .. })));

    // Runs into unmapped memory long before the length is reached.
    let huge = controller.read_memory(pc, 1 << 40);
    assert!(matches!(huge, Err(DebuggerError::MemoryAccess { .. })));

    // The session is unharmed.
    assert_eq!(controller.read_memory(pc, 4).unwrap().len(), 4);
    controller.kill_target().unwrap();
}

#[test]
fn test_kill_ends_session()
{
    let Some(mut controller) = launch_true(&LaunchOptions::default()) else {
        return;
    };
    controller.start().unwrap();

    assert_eq!(controller.kill_target().unwrap(), StopReason::Killed);
    assert!(!controller.tracee().is_active());
    assert!(matches!(
        controller.read_registers(),
        Err(DebuggerError::TargetTerminated { .. })
    ));
}

#[test]
fn test_launch_reports_exec_failure()
{
    let result = TargetProcess::launch(Path::new("/nonexistent/stepwise-target"), &[], &LaunchOptions::default());
    match result {
        Err(DebuggerError::LaunchFailed(reason)) => {
            assert!(reason.contains("execv") || reason.contains("PTRACE_TRACEME"));
        },
        Ok(_) => panic!("launching a missing program must fail"),
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[test]
fn test_attach_and_detach()
{
    let mut child = Command::new("/bin/sleep")
        .arg("30")
        .stdout(Stdio::null())
        .spawn()
        .unwrap();
    let pid = ProcessId::from(child.id() as i32);

    let target = match TargetProcess::attach(pid) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("skipping: cannot attach here ({e})");
            child.kill().unwrap();
            child.wait().unwrap();
            return;
        },
    };
    let mut controller = ExecutionController::new(target, ControllerOptions::default());

    assert!(matches!(controller.start().unwrap(), StopReason::Signal(Signal::SIGSTOP, _)));
    assert_eq!(controller.detach_target().unwrap(), StopReason::Detached);
    assert!(!controller.tracee().is_active());

    // Still alive and untraced.
    child.kill().unwrap();
    child.wait().unwrap();
}
