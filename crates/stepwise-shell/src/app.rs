//! Shell state and command dispatch

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use reedline::{Reedline, Signal};
use stepwise_core::{DebuggerError, ExecutionController, SetBreakpointOutcome, StopReason, Tracee};
use stepwise_utils::{error, info, warn};

use crate::command::{BreakpointAction, Command};
use crate::prompt::StepwisePrompt;
use crate::registers::RegisterNames;
use crate::render;

/// Whether the loop keeps reading lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow
{
    /// Read the next line
    Continue,
    /// Leave the loop
    Exit,
}

/// Failure while executing one command
#[derive(Debug, thiserror::Error)]
pub enum ShellError
{
    /// The controller refused or failed the operation
    #[error(transparent)]
    Debugger(#[from] DebuggerError),

    /// Writing to the output failed
    #[error("Output error: {0}")]
    Io(#[from] io::Error),
}

/// Interactive shell driving one debugging session
///
/// Owns the controller for the whole session. Results are rendered to `out`;
/// status and errors go through `tracing`.
pub struct Shell<'n, T: Tracee, W: Write>
{
    controller: ExecutionController<T>,
    names: &'n RegisterNames,
    out: W,
}

impl<'n, T: Tracee, W: Write> Shell<'n, T, W>
{
    /// Create a shell around a started controller.
    pub fn new(controller: ExecutionController<T>, names: &'n RegisterNames, out: W) -> Self
    {
        Self { controller, names, out }
    }

    /// The controller being driven.
    pub fn controller(&self) -> &ExecutionController<T>
    {
        &self.controller
    }

    /// Everything rendered so far, when writing to an in-memory sink.
    pub fn output(&self) -> &W
    {
        &self.out
    }

    /// Hand the controller back, ending the shell.
    pub fn into_controller(self) -> ExecutionController<T>
    {
        self.controller
    }

    /// Read and execute lines until the user leaves or the target is gone.
    ///
    /// Ctrl-C discards the current line. Ctrl-D behaves like `quit`.
    ///
    /// ## Errors
    ///
    /// Only terminal I/O failures end the loop with an error; command failures
    /// are logged and the shell keeps going.
    pub fn run(&mut self) -> io::Result<()>
    {
        let mut editor = Reedline::create();
        let mut prompt = StepwisePrompt::new(self.controller.pid());

        writeln!(self.out, "Stepwise interactive shell (type 'help' for a list of commands)")?;
        if let Some(stop) = self.controller.last_stop() {
            writeln!(self.out, "{stop}")?;
        }

        while self.controller.is_active() {
            prompt.set_location(self.controller.last_stop().and_then(StopReason::location));
            self.out.flush()?;

            let flow = match editor.read_line(&prompt)? {
                Signal::Success(line) => self.handle_line(&line)?,
                Signal::CtrlC => Flow::Continue,
                Signal::CtrlD => self.dispatch(Command::Quit)?,
            };
            if flow == Flow::Exit {
                break;
            }
        }
        self.out.flush()
    }

    /// Parse and execute one line.
    ///
    /// ## Errors
    ///
    /// Only output failures are returned. Parse errors and controller errors
    /// are logged.
    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow>
    {
        match Command::parse(line, self.names) {
            Ok(Some(command)) => self.dispatch(command),
            Ok(None) => Ok(Flow::Continue),
            Err(e) => {
                error!("{e}");
                Ok(Flow::Continue)
            },
        }
    }

    /// Execute a parsed command, logging controller errors.
    fn dispatch(&mut self, command: Command) -> io::Result<Flow>
    {
        match self.execute(command) {
            Ok(flow) => Ok(flow),
            Err(ShellError::Io(e)) => Err(e),
            Err(ShellError::Debugger(e)) => {
                error!(pid = self.controller.pid().0, "{e}");
                Ok(self.flow())
            },
        }
    }

    /// Execute a parsed command against the controller.
    ///
    /// ## Errors
    ///
    /// Whatever the controller reports, or an output failure.
    pub fn execute(&mut self, command: Command) -> Result<Flow, ShellError>
    {
        match command {
            Command::Quit => {
                if self.controller.is_active() {
                    let stop = self.controller.kill_target()?;
                    self.report(stop)?;
                }
                return Ok(Flow::Exit);
            },
            Command::Detach => {
                let stop = self.controller.detach_target()?;
                self.report(stop)?;
                return Ok(Flow::Exit);
            },
            Command::Clear => execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?,
            Command::Help => write!(self.out, "{}", render::help())?,
            Command::Continue => {
                let stop = self.controller.continue_execution()?;
                self.report(stop)?;
            },
            Command::ContinueUntil(address) => {
                let stop = self.controller.continue_until(address)?;
                self.report(stop)?;
            },
            Command::Step => {
                let stop = self.controller.step_into()?;
                self.report(stop)?;
            },
            Command::StepUntil(address) => {
                let stop = self.controller.step_until(address)?;
                self.report(stop)?;
            },
            Command::Breakpoint { address, action } => match action {
                BreakpointAction::Enable => match self.controller.set_breakpoint(address)? {
                    SetBreakpointOutcome::Created => info!(address = %address, "Breakpoint set"),
                    SetBreakpointOutcome::Reenabled => info!(address = %address, "Breakpoint enabled"),
                    SetBreakpointOutcome::AlreadyEnabled => warn!(address = %address, "Breakpoint already enabled"),
                },
                BreakpointAction::Disable => {
                    self.controller.disable_breakpoint(address)?;
                    info!(address = %address, "Breakpoint disabled");
                },
                BreakpointAction::Delete => {
                    self.controller.delete_breakpoint(address)?;
                    info!(address = %address, "Breakpoint deleted");
                },
            },
            Command::ListBreakpoints => write!(self.out, "{}", render::breakpoints(&self.controller.breakpoints()))?,
            Command::WriteRegister { register, value } => {
                self.controller.write_register(register, value)?;
                info!(register = %register, value = format_args!("{value:#x}"), "Register written");
            },
            Command::PrintMemory { address, size } => {
                let bytes = self.controller.read_memory(address, size)?;
                write!(self.out, "{}", render::hexdump(address, &bytes))?;
            },
            Command::PrintRegisters(None) => {
                let regs = self.controller.read_registers()?;
                write!(self.out, "{}", render::registers(&regs))?;
            },
            Command::PrintRegisters(Some(id)) => {
                let regs = self.controller.read_registers()?;
                writeln!(self.out, "{}", render::register(id, regs.get(id)))?;
            },
        }
        Ok(self.flow())
    }

    fn report(&mut self, stop: StopReason) -> io::Result<()>
    {
        writeln!(self.out, "{stop}")
    }

    fn flow(&self) -> Flow
    {
        if self.controller.is_active() {
            Flow::Continue
        } else {
            Flow::Exit
        }
    }
}
