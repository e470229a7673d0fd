use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

/// Copy `source` to `dest`, returning the number of bytes copied.
///
/// `source` must be a regular file. An existing `dest` is only replaced when
/// `overwrite` is set. Missing parent directories of `dest` are created.
pub fn copy_file(source: &Path, dest: &Path, overwrite: bool) -> Result<u64> {
    if !source.exists() {
        bail!("source file does not exist: {}", source.display());
    }
    if !source.is_file() {
        bail!("source is not a regular file: {}", source.display());
    }
    if dest.exists() && !overwrite {
        bail!("destination already exists: {}", dest.display());
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let bytes = fs::copy(source, dest).with_context(|| {
        format!("failed to copy {} to {}", source.display(), dest.display())
    })?;
    tracing::debug!(bytes, "copied file");
    Ok(bytes)
}
