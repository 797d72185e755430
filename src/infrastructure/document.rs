use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;

/// Loads the exported manual page from disk.
///
/// The file is expected to be a plain-text export produced with
/// `man <tool> | col -bx > <tool>.man`. Missing or empty files are errors.
pub fn load_manual_page(path: &Path) -> Result<String> {
    debug!("Loading manual page from {:?}", path);

    let content = fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read manual page {:?}. Export one with `man <tool> | col -bx > {:?}`",
            path, path
        )
    })?;

    if content.trim().is_empty() {
        bail!("Manual page {:?} is empty", path);
    }

    Ok(content)
}
