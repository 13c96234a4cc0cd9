//! # stepwise-shell
//!
//! Interactive command shell for the Stepwise debugger.
//!
//! The shell reads one command per line with `reedline`, parses it into a
//! [`Command`], drives the [`ExecutionController`] and renders the results:
//! stop reports, register dumps, hexdumps and breakpoint lists. Status
//! messages and errors go through `tracing`; a bad command never ends the
//! session.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use stepwise_core::platform::linux::{LaunchOptions, TargetProcess};
//! use stepwise_core::{ControllerOptions, ExecutionController};
//! use stepwise_shell::{RegisterNames, run_shell};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let target = TargetProcess::launch(Path::new("/bin/true"), &[], &LaunchOptions::default())?;
//! let mut controller = ExecutionController::new(target, ControllerOptions::default());
//! controller.start()?;
//!
//! let names = RegisterNames::new();
//! run_shell(controller, &names)?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod command;
pub mod prompt;
pub mod registers;
pub mod render;

use std::io;

pub use app::{Flow, Shell, ShellError};
pub use command::{BreakpointAction, Command, CommandError};
pub use prompt::StepwisePrompt;
pub use registers::RegisterNames;
use stepwise_core::{ExecutionController, Tracee};

/// Run the interactive shell on stdout until the session ends
///
/// The controller must already be started. It is dropped when the shell
/// returns, which releases the target if the user did not quit or detach.
///
/// ## Errors
///
/// Returns an error if the terminal cannot be read or written.
pub fn run_shell<T: Tracee>(controller: ExecutionController<T>, names: &RegisterNames) -> io::Result<()>
{
    Shell::new(controller, names, io::stdout()).run()
}
