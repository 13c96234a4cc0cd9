//! Pre-launch checks on the program to debug.
//!
//! The ptrace backend can only drive native ELF executables. Catching a
//! wrong path here gives a clear message instead of an opaque `execv` error
//! from inside the forked child.

use std::fs::File;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use object::FileKind;

use crate::error::{DebuggerError, Result};

/// Bytes needed to identify the file format (the ELF `e_ident` block).
const IDENT_LEN: u64 = 16;

/// Check that `path` names an executable ELF file.
///
/// ## Example
///
/// ```rust,no_run
/// use std::path::Path;
///
/// stepwise_core::validate_executable(Path::new("/bin/true"))?;
/// # Ok::<(), stepwise_core::DebuggerError>(())
/// ```
///
/// ## Errors
///
/// - `InvalidExecutable`: missing, not a regular file, not executable, or
///   not ELF
/// - `Io`: the file exists but could not be read
pub fn validate_executable(path: &Path) -> Result<()>
{
    let invalid = |reason: &str| DebuggerError::InvalidExecutable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let metadata = std::fs::metadata(path).map_err(|_| invalid("no such file"))?;
    if !metadata.is_file() {
        return Err(invalid("not a regular file"));
    }
    if metadata.permissions().mode() & 0o111 == 0 {
        return Err(invalid("missing execute permission"));
    }

    let mut ident = Vec::with_capacity(IDENT_LEN as usize);
    File::open(path)?.take(IDENT_LEN).read_to_end(&mut ident)?;

    match FileKind::parse(ident.as_slice()) {
        Ok(FileKind::Elf64 | FileKind::Elf32) => {
            tracing::debug!(path = %path.display(), "Executable looks like ELF");
            Ok(())
        },
        Ok(kind) => Err(invalid(&format!("unsupported file format {kind:?}"))),
        Err(_) => Err(invalid("not an ELF file")),
    }
}
