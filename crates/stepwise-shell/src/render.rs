//! Text rendering for command results
//!
//! The controller hands back plain values (register snapshots, byte vectors,
//! breakpoint rows). This module owns every decision about how they look on
//! screen. All functions return `String`s so they can be checked in tests and
//! written to any sink.

use std::fmt::Write as _;

use stepwise_core::{Address, BreakpointInfo, RegisterId, Registers};

/// Bytes per hexdump row.
const ROW_LEN: usize = 16;
/// Extra gap after this many bytes inside a row.
const COLUMN_LEN: usize = 8;

/// Command reference printed by `help`.
pub const HELP: &[(&str, &str)] = &[
    ("help (h)", "Show this list"),
    ("quit (q)", "Kill the target and leave"),
    ("clear", "Clear the screen"),
    ("detach", "Release the target and leave; it keeps running"),
    ("continue (c) [until ADDR]", "Resume until the next stop, or until ADDR"),
    ("step (s) [until ADDR]", "Execute one instruction, or step until ADDR"),
    ("breakpoint (break, b) ADDR [enable|disable|delete]", "Manage the breakpoint at ADDR"),
    ("breakpoint list", "List breakpoints"),
    ("write %REGISTER VALUE", "Set a register (VALUE: decimal, 0x hex or 0o octal)"),
    ("print memory (mem) ADDR [SIZE]", "Hexdump SIZE bytes at ADDR (default 4, at most 1 MiB)"),
    ("print registers (regs) [REGISTER]", "Show all registers, or one"),
];

/// Full register dump, one register per line in dump order.
#[must_use]
pub fn registers(regs: &Registers) -> String
{
    regs.iter().map(|(id, value)| register(id, value) + "\n").collect()
}

/// One `name  0x...` line, without a trailing newline.
#[must_use]
pub fn register(id: RegisterId, value: u64) -> String
{
    format!("{:<6} {value:#018x}", id.name())
}

/// Classic hexdump: address, 16 bytes split in two groups of 8, then an
/// ASCII column where non-printable bytes show as `.`.
///
/// ```text
/// 0000000000401000  48 65 6C 6C 6F 2C 20 77  6F 72 6C 64 0A 00 00 00  |Hello,.world....|
/// ```
#[must_use]
pub fn hexdump(address: Address, bytes: &[u8]) -> String
{
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(ROW_LEN).enumerate() {
        let offset = (row * ROW_LEN) as u64;
        let _ = write!(out, "{:016X} ", address.value().wrapping_add(offset));

        for column in 0..ROW_LEN {
            if column % COLUMN_LEN == 0 {
                out.push(' ');
            }
            match chunk.get(column) {
                Some(byte) => {
                    let _ = write!(out, "{byte:02X} ");
                },
                None => out.push_str("   "),
            }
        }

        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| if b.is_ascii_graphic() { char::from(b) } else { '.' }));
        out.push_str("|\n");
    }
    out
}

/// Breakpoint listing, sorted as the controller returns it.
#[must_use]
pub fn breakpoints(rows: &[BreakpointInfo]) -> String
{
    if rows.is_empty() {
        return "No breakpoints set\n".to_string();
    }

    let mut out = String::new();
    for row in rows {
        let state = if row.enabled { "Enabled" } else { "Disabled" };
        let _ = write!(out, "Breakpoint @{}: {state}", row.address);
        if row.pending {
            out.push_str(" (stepping over)");
        }
        out.push('\n');
    }
    out
}

/// The `help` text.
#[must_use]
pub fn help() -> String
{
    let width = HELP.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
    HELP.iter()
        .map(|(usage, about)| format!("  {usage:<width$}  {about}\n"))
        .collect()
}
