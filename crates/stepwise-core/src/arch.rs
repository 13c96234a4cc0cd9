//! # Trap Instruction Encoding
//!
//! Where and how the software-breakpoint opcode is spliced into an
//! instruction word.
//!
//! ptrace reads and writes code one machine word at a time. A breakpoint only
//! replaces the single byte that sits at the breakpoint address, which is the
//! lowest-addressed byte of the word read from that address. Which bit range
//! of the `u64` that byte occupies depends on the target's byte order, so the
//! patch position is derived from [`ByteOrder`] instead of being hard-coded.

/// x86-64 breakpoint instruction (`INT3`)
pub const X86_64_INT3_OPCODE: u8 = 0xCC;

/// Distance between the program counter reported after a trap and the
/// breakpoint address.
///
/// The trap fires after the one-byte `INT3` has executed, so the program
/// counter is one past the patched byte.
pub const X86_64_TRAP_PC_OFFSET: u64 = 1;

/// Byte order of the traced process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder
{
    /// Lowest-addressed byte is the least significant byte of a word
    Little,
    /// Lowest-addressed byte is the most significant byte of a word
    Big,
}

impl ByteOrder
{
    /// Byte order of the machine the debugger was built for.
    #[must_use]
    pub const fn native() -> Self
    {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    const fn shift(self) -> u32
    {
        match self {
            ByteOrder::Little => 0,
            ByteOrder::Big => u64::BITS - u8::BITS,
        }
    }
}

/// A one-byte trap instruction and the rules for patching it into code
///
/// ## Example
///
/// ```rust
/// use stepwise_core::arch::{ByteOrder, TrapInstruction};
///
/// let trap = TrapInstruction::new(0xCC, 1, ByteOrder::Little);
/// let (patched, saved) = trap.patch(0x1122_3344_5566_7755);
/// assert_eq!(patched, 0x1122_3344_5566_77CC);
/// assert_eq!(saved, 0x55);
/// assert_eq!(trap.restore(patched, saved), 0x1122_3344_5566_7755);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapInstruction
{
    opcode: u8,
    pc_offset: u64,
    byte_order: ByteOrder,
}

impl TrapInstruction
{
    /// Describe a trap instruction.
    ///
    /// - `opcode`: the byte written at the breakpoint address
    /// - `pc_offset`: how far past the breakpoint the program counter is
    ///   reported once the trap has fired
    /// - `byte_order`: the target's byte order
    #[must_use]
    pub const fn new(opcode: u8, pc_offset: u64, byte_order: ByteOrder) -> Self
    {
        Self {
            opcode,
            pc_offset,
            byte_order,
        }
    }

    /// `INT3` on a little-endian x86-64 target.
    #[must_use]
    pub const fn x86_64() -> Self
    {
        Self::new(X86_64_INT3_OPCODE, X86_64_TRAP_PC_OFFSET, ByteOrder::Little)
    }

    /// The trap opcode byte.
    #[must_use]
    pub const fn opcode(self) -> u8
    {
        self.opcode
    }

    /// Distance from the reported program counter back to the breakpoint.
    #[must_use]
    pub const fn pc_offset(self) -> u64
    {
        self.pc_offset
    }

    /// Byte order used to locate the patch byte.
    #[must_use]
    pub const fn byte_order(self) -> ByteOrder
    {
        self.byte_order
    }

    /// The byte of `word` that lives at the word's own address.
    #[must_use]
    pub const fn patch_byte(self, word: u64) -> u8
    {
        ((word >> self.byte_order.shift()) & 0xFF) as u8
    }

    /// Replace the patch byte of `word` with the trap opcode.
    ///
    /// Returns the patched word and the displaced byte.
    #[must_use]
    pub const fn patch(self, word: u64) -> (u64, u8)
    {
        (self.splice(word, self.opcode), self.patch_byte(word))
    }

    /// Put `saved` back into the patch byte position of `word`.
    #[must_use]
    pub const fn restore(self, word: u64, saved: u8) -> u64
    {
        self.splice(word, saved)
    }

    const fn splice(self, word: u64, byte: u8) -> u64
    {
        let shift = self.byte_order.shift();
        (word & !(0xFF << shift)) | ((byte as u64) << shift)
    }
}

impl Default for TrapInstruction
{
    fn default() -> Self
    {
        Self::x86_64()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_little_endian_patches_low_byte()
    {
        let trap = TrapInstruction::new(0xCC, 1, ByteOrder::Little);
        let (patched, saved) = trap.patch(0x0000_0000_0000_0048);
        assert_eq!(patched, 0xCC);
        assert_eq!(saved, 0x48);
    }

    #[test]
    fn test_big_endian_patches_high_byte()
    {
        let trap = TrapInstruction::new(0xCC, 1, ByteOrder::Big);
        let (patched, saved) = trap.patch(0x4800_0000_0000_0011);
        assert_eq!(patched, 0xCC00_0000_0000_0011);
        assert_eq!(saved, 0x48);
        assert_eq!(trap.restore(patched, saved), 0x4800_0000_0000_0011);
    }

    #[test]
    fn test_restore_leaves_other_bytes_alone()
    {
        let trap = TrapInstruction::x86_64();
        // The upper bytes changed while the patch was in place.
        let live = 0xAAAA_AAAA_AAAA_AACC;
        assert_eq!(trap.restore(live, 0x55), 0xAAAA_AAAA_AAAA_AA55);
    }
}
