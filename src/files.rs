//! Reading inputs and writing converted outputs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{BridgeError, BridgeResult};

/// Extensions accepted as SQL input.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["sql", "txt"];

/// Check that `path` is a non-empty file with a supported extension.
pub fn validate_input(path: &Path) -> BridgeResult<()> {
    if !path.exists() {
        return Err(BridgeError::invalid_input(path, "file does not exist"));
    }
    if !path.is_file() {
        return Err(BridgeError::invalid_input(path, "path is not a file"));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(BridgeError::invalid_input(
            path,
            format!("unsupported file type (supported: .{})", SUPPORTED_EXTENSIONS.join(", .")),
        ));
    }

    if fs::metadata(path)?.len() == 0 {
        return Err(BridgeError::invalid_input(path, "file is empty"));
    }
    Ok(())
}

/// Validate and read an input file. Invalid UTF-8 is replaced, not rejected.
pub fn read_input(path: &Path) -> BridgeResult<String> {
    validate_input(path)?;
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `queries.sql` → `queries_fabric.sql`, next to the input.
pub fn output_path(input: &Path) -> PathBuf {
    sibling(input, "_fabric")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(name)
}

/// Write `content`, creating parent directories as needed.
pub fn write_output(path: &Path, content: &str) -> BridgeResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    info!(path = %path.display(), bytes = content.len(), "wrote output");
    Ok(())
}

/// Copy `path` to the first free `<stem>_backup<N><ext>`.
///
/// Returns `None` when there is nothing to back up.
pub fn create_backup(path: &Path) -> BridgeResult<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = (1..)
        .map(|n| sibling(path, &format!("_backup{}", n)))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| BridgeError::invalid_input(path, "no free backup name"))?;
    fs::copy(path, &backup)?;
    info!(from = %path.display(), to = %backup.display(), "created backup");
    Ok(Some(backup))
}
