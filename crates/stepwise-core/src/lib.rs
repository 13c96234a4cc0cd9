//! # stepwise-core
//!
//! Breakpoint and execution-control engine for Stepwise.
//!
//! This crate provides the foundational debugging capabilities:
//! - Launching a program under trace, or attaching to a running one
//! - Software breakpoints (trap opcode patching)
//! - The step-over protocol for resuming through a breakpoint
//! - Register and memory inspection
//!
//! ## Platform Support
//!
//! - **Linux (x86-64)**: `ptrace` (see [`platform::linux`])
//!
//! The breakpoint table and the [`ExecutionController`] only talk to a
//! [`Tracee`], so they build and test on every platform.
//!
//! ## Why unsafe code is needed
//!
//! Starting a traced child needs `fork()` and a few async-signal-safe `libc`
//! calls between fork and exec. Everything else goes through the safe `nix`
//! wrappers.

#![allow(unsafe_code)] // fork / exec handshake

pub mod arch;
pub mod breakpoints;
pub mod controller;
pub mod error;
pub mod executable;
pub mod platform;
pub mod tracee;
pub mod types;

pub use arch::{ByteOrder, TrapInstruction};
pub use breakpoints::{Breakpoint, BreakpointInfo, BreakpointTable, SetBreakpointOutcome};
pub use controller::{ControllerOptions, ExecutionController, ExecutionState};
pub use error::{DebuggerError, Result};
pub use executable::validate_executable;
pub use tracee::Tracee;
pub use types::{Address, ProcessId, RegisterId, Registers, StopEvent, StopReason, X86_64Register};
