//! Symbolic register names
//!
//! The shell accepts registers by name (`%rax`, `rip`, `pc`, ...). The
//! lookup table is built once at startup and shared by reference; it is never
//! mutated afterwards.

use std::collections::HashMap;

use stepwise_core::RegisterId;

/// Extra spellings accepted on top of each register's canonical name.
const ALIASES: &[(&str, RegisterId)] = &[
    ("pc", RegisterId::Pc),
    ("sp", RegisterId::Sp),
    ("fp", RegisterId::Fp),
    ("flags", RegisterId::Status),
    ("rflags", RegisterId::Status),
];

/// Immutable map from register name to [`RegisterId`]
///
/// ## Example
///
/// ```rust
/// use stepwise_core::RegisterId;
/// use stepwise_shell::RegisterNames;
///
/// let names = RegisterNames::new();
/// assert_eq!(names.lookup("%RIP"), Some(RegisterId::Pc));
/// assert_eq!(names.lookup("pc"), Some(RegisterId::Pc));
/// assert_eq!(names.lookup("xmm0"), None);
/// ```
#[derive(Debug, Clone)]
pub struct RegisterNames
{
    by_name: HashMap<&'static str, RegisterId>,
}

impl RegisterNames
{
    /// Build the table: every canonical name plus the common aliases.
    #[must_use]
    pub fn new() -> Self
    {
        let by_name = RegisterId::ALL
            .iter()
            .map(|&id| (id.name(), id))
            .chain(ALIASES.iter().copied())
            .collect();
        Self { by_name }
    }

    /// Resolve a register name, ignoring case and an optional leading `%`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<RegisterId>
    {
        let name = name.strip_prefix('%').unwrap_or(name).to_ascii_lowercase();
        self.by_name.get(name.as_str()).copied()
    }

    /// Number of accepted spellings.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.by_name.len()
    }

    /// Whether the table holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.by_name.is_empty()
    }
}

impl Default for RegisterNames
{
    fn default() -> Self
    {
        Self::new()
    }
}
