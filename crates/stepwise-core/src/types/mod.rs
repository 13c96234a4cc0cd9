//! # Types
//!
//! Platform-agnostic types used throughout the debugger.
//!
//! These types keep the breakpoint table and the execution controller free of
//! ptrace details, so they can be driven by the Linux backend or by an
//! in-memory tracee in tests.

pub mod address;
pub mod process;
pub mod registers;

// Re-export all public types
pub use address::Address;
pub use process::{ProcessId, StopEvent, StopReason};
pub use registers::{RegisterId, Registers, X86_64Register};
