use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::Parser;
use nix::sys::signal::Signal;
use stepwise_core::ControllerOptions;
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
use stepwise_core::platform::linux::{LaunchOptions, TargetProcess};
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
use stepwise_core::{ExecutionController, ProcessId, validate_executable};
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
use stepwise_shell::{RegisterNames, run_shell};
use stepwise_utils::{LogFormat, LogLevel, LoggingConfig, error, info, init_logging_with};

/// A small ptrace debugger: software breakpoints, single stepping and
/// register/memory inspection.
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(version)]
#[command(about = "A small ptrace debugger with software breakpoints and single stepping", long_about = None)]
struct Cli
{
    /// Path to the executable to launch
    #[arg(required_unless_present = "attach", conflicts_with = "attach")]
    program: Option<PathBuf>,

    /// Arguments to pass to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Attach to a running process by PID instead of launching one
    #[arg(long, value_name = "PID")]
    attach: Option<i32>,

    /// Stop signal that ends the session (repeatable, default SIGSEGV)
    #[arg(long = "fatal-signal", value_name = "SIGNAL", value_parser = parse_signal)]
    fatal_signals: Vec<Signal>,

    /// Re-deliver non-trap stop signals to the program when it resumes
    #[arg(long, default_value_t = false)]
    forward_signals: bool,

    /// Disable address space randomization for launched programs
    #[arg(long, default_value_t = false)]
    no_aslr: bool,

    /// Log level (error, warn, info, debug, trace); defaults to RUST_LOG or info
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Log format (pretty, json); defaults to STEPWISE_LOG_FORMAT or pretty
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Also write logs to this file, rolled daily
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli
{
    fn controller_options(&self) -> ControllerOptions
    {
        let mut options = ControllerOptions {
            forward_signals: self.forward_signals,
            ..ControllerOptions::default()
        };
        if !self.fatal_signals.is_empty() {
            options.fatal_signals.clone_from(&self.fatal_signals);
        }
        options
    }
}

/// Accept `SIGSEGV`, `segv` or `11`.
fn parse_signal(text: &str) -> Result<Signal, String>
{
    let signal = match text.parse::<i32>() {
        Ok(number) => Signal::try_from(number).map_err(|_| format!("unknown signal number {number}"))?,
        Err(_) => {
            let upper = text.to_ascii_uppercase();
            let name = if upper.starts_with("SIG") { upper } else { format!("SIG{upper}") };
            Signal::from_str(&name).map_err(|_| format!("unknown signal '{text}'"))?
        },
    };
    if signal == Signal::SIGTRAP {
        return Err("SIGTRAP is reserved for breakpoints and stepping".to_string());
    }
    Ok(signal)
}

fn main()
{
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: cli.log_level,
        format: cli.log_format,
        file: cli.log_file.clone(),
    };
    if let Err(e) = init_logging_with(logging) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    if let Err(e) = run(cli) {
        error!("{e}");
        process::exit(1);
    }
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    let options = cli.controller_options();

    let target = match (cli.attach, cli.program) {
        (Some(pid), _) => {
            info!(pid, "Attaching to process");
            TargetProcess::attach(ProcessId::from(pid))?
        },
        (None, Some(program)) => {
            validate_executable(&program)?;
            info!(program = %program.display(), args = ?cli.args, "Launching program");
            TargetProcess::launch(&program, &cli.args, &LaunchOptions {
                disable_aslr: cli.no_aslr,
            })?
        },
        (None, None) => return Err("either PROGRAM or --attach <PID> is required".into()),
    };

    let mut controller = ExecutionController::new(target, options);
    let initial = controller.start()?;
    info!(pid = controller.pid().0, stop = %initial, "Target ready");

    // Built once, shared read-only with the shell for the whole session.
    let names = RegisterNames::new();
    run_shell(controller, &names)?;
    Ok(())
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    let _ = cli.controller_options();
    Err("stepwise only supports Linux on x86-64".into())
}
