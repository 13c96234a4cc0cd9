//! Tests for error handling

use std::path::PathBuf;

use nix::errno::Errno;
use stepwise_core::error::{DebuggerError, Result};
use stepwise_core::{Address, ProcessId};

#[test]
fn test_trace_error_names_operation_and_pid()
{
    let error = DebuggerError::trace("PTRACE_PEEKTEXT", ProcessId::from(12345), Errno::ESRCH);
    let message = format!("{}", error);
    assert!(message.contains("PTRACE_PEEKTEXT"));
    assert!(message.contains("12345"));
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_memory_access_display()
{
    let error = DebuggerError::MemoryAccess {
        address: Address::from(0x1000),
        len: 16,
        pid: ProcessId::from(7),
    };
    let message = format!("{}", error);
    assert!(message.contains("16 bytes"));
    assert!(message.contains("0x0000000000001000"));
}

#[test]
fn test_no_such_breakpoint_display()
{
    let error = DebuggerError::NoSuchBreakpoint(Address::from(0x401000));
    let message = format!("{}", error);
    assert!(message.contains("No breakpoint"));
    assert!(message.contains("401000"));
}

#[test]
fn test_target_terminated_is_terminal()
{
    let error = DebuggerError::TargetTerminated { pid: ProcessId::from(99) };
    assert!(error.is_terminal());
    assert!(format!("{}", error).contains("99"));

    assert!(!DebuggerError::NotStarted.is_terminal());
    assert!(!DebuggerError::NoSuchBreakpoint(Address::from(0)).is_terminal());
}

#[test]
fn test_invalid_executable_display()
{
    let error = DebuggerError::InvalidExecutable {
        path: PathBuf::from("/tmp/notes.txt"),
        reason: "not an ELF file".to_string(),
    };
    let message = format!("{}", error);
    assert!(message.contains("/tmp/notes.txt"));
    assert!(message.contains("not an ELF file"));
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error: DebuggerError = io.into();
    assert!(matches!(error, DebuggerError::Io(_)));
}

#[test]
fn test_result_type()
{
    // Test that Result type is properly aliased
    let _result: Result<()> = Ok(());
    let _error_result: Result<()> = Err(DebuggerError::NotStarted);
}
