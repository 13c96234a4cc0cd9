//! # Error Types
//!
//! General error handling for the debugger.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Address, ProcessId};

/// Main error type for debugger operations
///
/// Every variant is recoverable from the point of view of the debugger
/// itself: a failed trace call is reported to the caller and the session
/// stays interactive.
///
/// ## Error Categories
///
/// 1. **Trace errors**: TraceOperationFailed, MemoryAccess
/// 2. **Lifecycle errors**: TargetTerminated, NotStarted
/// 3. **Breakpoint errors**: NoSuchBreakpoint
/// 4. **Launch errors**: InvalidExecutable, LaunchFailed
/// 5. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum DebuggerError
{
    /// A ptrace / wait primitive failed
    ///
    /// The state change that was attempted is treated as not having
    /// occurred. `operation` names the primitive (`PTRACE_PEEKTEXT`,
    /// `waitpid`, ...).
    #[error("{operation} failed for pid {pid}: {source}")]
    TraceOperationFailed
    {
        /// Name of the primitive that failed
        operation: &'static str,
        /// Process the operation was issued against
        pid: ProcessId,
        /// Underlying errno
        #[source]
        source: nix::Error,
    },

    /// The requested memory range could not be read
    #[error("Unable to read {len} bytes at {address} in pid {pid}")]
    MemoryAccess
    {
        /// First address of the requested range
        address: Address,
        /// Requested length in bytes
        len: usize,
        /// Process the read was issued against
        pid: ProcessId,
    },

    /// No breakpoint exists at the given address
    ///
    /// Returned by disable/delete on an address the table does not know.
    #[error("No breakpoint at address {0}")]
    NoSuchBreakpoint(Address),

    /// The target has exited, was killed, faulted or was detached
    ///
    /// Once a session reaches this state every further trace operation is
    /// refused. This is distinct from a transient `TraceOperationFailed`.
    #[error("Target process {pid} is no longer being traced")]
    TargetTerminated
    {
        /// Process that is gone
        pid: ProcessId,
    },

    /// The session has not consumed the initial stop yet
    ///
    /// ## Solution
    ///
    /// Call `start()` on the controller before issuing other operations.
    #[error("Debugging session has not been started")]
    NotStarted,

    /// The program handed to the launcher is not a native executable
    #[error("Invalid executable '{}': {reason}", path.display())]
    InvalidExecutable
    {
        /// Path that was checked
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Forking, exec'ing or attaching to the target failed
    #[error("Failed to start debugging session: {0}")]
    LaunchFailed(String),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DebuggerError
{
    /// Build a [`DebuggerError::TraceOperationFailed`] for `pid`.
    #[must_use]
    pub fn trace(operation: &'static str, pid: ProcessId, source: nix::Error) -> Self
    {
        Self::TraceOperationFailed { operation, pid, source }
    }

    /// Whether this error means the session is over for good.
    #[must_use]
    pub fn is_terminal(&self) -> bool
    {
        matches!(self, Self::TargetTerminated { .. })
    }
}

/// Convenience type alias for `Result<T, DebuggerError>`
///
/// ```rust
/// use stepwise_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DebuggerError>;
