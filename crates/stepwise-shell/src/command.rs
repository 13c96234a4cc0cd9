//! Command-line parsing
//!
//! Turns one input line into a [`Command`]. Every number is validated here;
//! malformed input becomes a [`CommandError`] and never reaches the
//! controller.

use stepwise_core::{Address, RegisterId};

use crate::registers::RegisterNames;

/// Bytes shown by `print memory` when no size is given.
pub const DEFAULT_MEMORY_SIZE: usize = 4;
/// Largest `print memory` size accepted.
pub const MAX_MEMORY_SIZE: usize = 1 << 20;

/// What to do with the breakpoint named in `breakpoint ADDR [ACTION]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointAction
{
    /// Create the breakpoint, or arm it again (the default)
    Enable,
    /// Lift the trap but keep the record
    Disable,
    /// Lift the trap and forget the record
    Delete,
}

/// One parsed shell command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command
{
    /// `quit` / `q`
    Quit,
    /// `clear`
    Clear,
    /// `continue` / `c`
    Continue,
    /// `continue until ADDR`
    ContinueUntil(Address),
    /// `breakpoint ADDR [enable|disable|delete]`
    Breakpoint
    {
        address: Address,
        action: BreakpointAction,
    },
    /// `breakpoint list`
    ListBreakpoints,
    /// `step` / `s`
    Step,
    /// `step until ADDR`
    StepUntil(Address),
    /// `write %REGISTER VALUE`
    WriteRegister
    {
        register: RegisterId,
        value: u64,
    },
    /// `print memory ADDR [SIZE]`
    PrintMemory
    {
        address: Address,
        size: usize,
    },
    /// `print registers [REGISTER]`
    PrintRegisters(Option<RegisterId>),
    /// `detach`
    Detach,
    /// `help` / `h`
    Help,
}

/// Why an input line was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError
{
    /// The first word is not a command
    #[error("Unknown command '{0}' (type 'help' for a list of commands)")]
    UnknownCommand(String),

    /// A required argument is absent
    #[error("Command '{command}' requires argument '{argument}'")]
    MissingArgument
    {
        command: &'static str,
        argument: &'static str,
    },

    /// Trailing words the command does not take
    #[error("Unexpected argument '{argument}' for command '{command}'")]
    UnexpectedArgument
    {
        command: &'static str,
        argument: String,
    },

    /// A sub-command or option the command does not know
    #[error("Invalid {command} option '{option}'")]
    InvalidOption
    {
        command: &'static str,
        option: String,
    },

    /// Not a hexadecimal address
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    /// Not a number in any accepted base
    #[error("Invalid value '{0}'")]
    InvalidValue(String),

    /// `print memory` size above [`MAX_MEMORY_SIZE`]
    #[error("Memory size {0} exceeds the limit of {MAX_MEMORY_SIZE} bytes")]
    MemorySizeTooLarge(u64),

    /// Register name not in the table
    #[error("Unsupported register '{0}'")]
    UnknownRegister(String),

    /// `write` only targets registers
    #[error("Invalid write target '{0}' (expected %REGISTER)")]
    InvalidWriteTarget(String),
}

impl Command
{
    /// Parse one input line.
    ///
    /// Returns `Ok(None)` for a blank line.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use stepwise_core::Address;
    /// use stepwise_shell::{Command, RegisterNames};
    ///
    /// let names = RegisterNames::new();
    /// let cmd = Command::parse("c until 401000", &names).unwrap();
    /// assert_eq!(cmd, Some(Command::ContinueUntil(Address::from(0x401000))));
    /// ```
    ///
    /// ## Errors
    ///
    /// A [`CommandError`] describing the first problem found.
    pub fn parse(line: &str, names: &RegisterNames) -> Result<Option<Self>, CommandError>
    {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let mut args = Args { command: "", words };

        let command = match head {
            "quit" | "q" => args.finish("quit", Command::Quit)?,
            "clear" => args.finish("clear", Command::Clear)?,
            "detach" => args.finish("detach", Command::Detach)?,
            "help" | "h" => args.finish("help", Command::Help)?,
            "continue" | "c" => {
                args.command = "continue";
                match args.until()? {
                    Some(address) => Command::ContinueUntil(address),
                    None => Command::Continue,
                }
            },
            "step" | "s" => {
                args.command = "step";
                match args.until()? {
                    Some(address) => Command::StepUntil(address),
                    None => Command::Step,
                }
            },
            "breakpoint" | "break" | "b" => {
                args.command = "breakpoint";
                parse_breakpoint(&mut args)?
            },
            "write" => {
                args.command = "write";
                parse_write(&mut args, names)?
            },
            "print" => {
                args.command = "print";
                parse_print(&mut args, names)?
            },
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Remaining words of the line being parsed.
struct Args<'a>
{
    command: &'static str,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a>
{
    fn next(&mut self) -> Option<&'a str>
    {
        self.words.next()
    }

    fn require(&mut self, argument: &'static str) -> Result<&'a str, CommandError>
    {
        self.words.next().ok_or(CommandError::MissingArgument {
            command: self.command,
            argument,
        })
    }

    fn end(&mut self) -> Result<(), CommandError>
    {
        match self.words.next() {
            Some(extra) => Err(CommandError::UnexpectedArgument {
                command: self.command,
                argument: extra.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn finish(&mut self, command: &'static str, parsed: Command) -> Result<Command, CommandError>
    {
        self.command = command;
        self.end()?;
        Ok(parsed)
    }

    /// Optional `until ADDR` suffix.
    fn until(&mut self) -> Result<Option<Address>, CommandError>
    {
        let Some(word) = self.next() else {
            return Ok(None);
        };
        if word != "until" {
            return Err(CommandError::InvalidOption {
                command: self.command,
                option: word.to_string(),
            });
        }
        let address = parse_address(self.require("ADDR")?)?;
        self.end()?;
        Ok(Some(address))
    }
}

fn parse_breakpoint(args: &mut Args<'_>) -> Result<Command, CommandError>
{
    let target = args.require("ADDR")?;
    if target == "list" {
        args.end()?;
        return Ok(Command::ListBreakpoints);
    }

    let address = parse_address(target)?;
    let action = match args.next() {
        None | Some("enable") => BreakpointAction::Enable,
        Some("disable") => BreakpointAction::Disable,
        Some("delete") => BreakpointAction::Delete,
        Some(other) => {
            return Err(CommandError::InvalidOption {
                command: "breakpoint",
                option: other.to_string(),
            })
        },
    };
    args.end()?;
    Ok(Command::Breakpoint { address, action })
}

fn parse_write(args: &mut Args<'_>, names: &RegisterNames) -> Result<Command, CommandError>
{
    let target = args.require("%REGISTER")?;
    if !target.starts_with('%') {
        return Err(CommandError::InvalidWriteTarget(target.to_string()));
    }
    let register = names
        .lookup(target)
        .ok_or_else(|| CommandError::UnknownRegister(target.to_string()))?;
    let value = parse_value(args.require("VALUE")?)?;
    args.end()?;
    Ok(Command::WriteRegister { register, value })
}

fn parse_print(args: &mut Args<'_>, names: &RegisterNames) -> Result<Command, CommandError>
{
    match args.require("registers|memory")? {
        "registers" | "regs" => {
            let register = match args.next() {
                Some(name) => Some(names.lookup(name).ok_or_else(|| CommandError::UnknownRegister(name.to_string()))?),
                None => None,
            };
            args.end()?;
            Ok(Command::PrintRegisters(register))
        },
        "memory" | "mem" => {
            let address = parse_address(args.require("ADDR")?)?;
            let size = match args.next() {
                Some(word) => {
                    let size = parse_value(word)?;
                    usize::try_from(size)
                        .ok()
                        .filter(|&size| size <= MAX_MEMORY_SIZE)
                        .ok_or(CommandError::MemorySizeTooLarge(size))?
                },
                None => DEFAULT_MEMORY_SIZE,
            };
            args.end()?;
            Ok(Command::PrintMemory { address, size })
        },
        other => Err(CommandError::InvalidOption {
            command: "print",
            option: other.to_string(),
        }),
    }
}

/// Parse a hexadecimal address, with or without a `0x` prefix.
///
/// ## Errors
///
/// [`CommandError::InvalidAddress`] if the text is not hexadecimal or does
/// not fit in 64 bits.
pub fn parse_address(text: &str) -> Result<Address, CommandError>
{
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CommandError::InvalidAddress(text.to_string()));
    }
    u64::from_str_radix(digits, 16)
        .map(Address::from)
        .map_err(|_| CommandError::InvalidAddress(text.to_string()))
}

/// Parse a register value: `0x` hex, `0o` octal, otherwise decimal.
///
/// ## Errors
///
/// [`CommandError::InvalidValue`] if the text is not a number in the
/// indicated base or does not fit in 64 bits.
pub fn parse_value(text: &str) -> Result<u64, CommandError>
{
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(octal) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        (octal, 8)
    } else {
        (text, 10)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(CommandError::InvalidValue(text.to_string()));
    }
    u64::from_str_radix(digits, radix).map_err(|_| CommandError::InvalidValue(text.to_string()))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_address_rejects_sign_prefix()
    {
        // from_str_radix alone would accept a leading '+'.
        assert!(parse_address("+10").is_err());
        assert!(parse_value("+10").is_err());
    }

    #[test]
    fn test_parse_value_overflow()
    {
        assert_eq!(parse_value("18446744073709551615").unwrap(), u64::MAX);
        assert!(matches!(
            parse_value("18446744073709551616"),
            Err(CommandError::InvalidValue(_))
        ));
        assert!(parse_address("1ffffffffffffffff").is_err());
    }
}
