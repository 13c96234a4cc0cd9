//! # Platform-Specific Implementations
//!
//! Each platform implements the [`Tracee`](crate::tracee::Tracee) trait with
//! its native debugging APIs:
//!
//! - **Linux (x86-64)**: `ptrace` system call
//!   - See: [ptrace(2) man page](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//!
//! Everything above this module (breakpoints, controller) is platform
//! agnostic and builds everywhere.

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub mod linux;
