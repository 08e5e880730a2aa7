//! Temp artifact lifecycle: fresh working directories, synthesized sources and
//! executables, and best-effort cleanup.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix for synthesized C++ sources
pub const SOURCE_SUFFIX: &str = ".cpp";

/// Suffix for linked executables on this platform
pub const EXECUTABLE_SUFFIX: &str = if cfg!(windows) { ".exe" } else { "" };

/// Make `path` an existing, empty directory.
///
/// Creates it, removes the whole tree, then creates it again. Permission
/// problems surface as errors.
pub fn ensure_empty_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)?;
    std::fs::remove_dir_all(path)?;
    std::fs::create_dir_all(path)
}

/// Remove a file or directory tree, ignoring any error.
///
/// Some platforms hold file handles for a moment after a child exits.
pub fn try_remove(path: &Path) {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    if let Err(e) = result {
        debug!("Could not remove {}: {}", path.display(), e);
    }
}

/// Write `content` to a new, persistent temp file with the given suffix and
/// return its path. The caller owns the file from then on.
pub fn create_temp_file(suffix: &str, content: &str) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("cxxprobe-")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep()?;
    Ok(path)
}

/// Reserve a fresh path for an executable without creating a file there
pub fn reserve_executable_path() -> std::io::Result<PathBuf> {
    let path = create_temp_file(EXECUTABLE_SUFFIX, "")?;
    std::fs::remove_file(&path)?;
    Ok(path)
}
