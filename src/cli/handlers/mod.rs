//! CLI command handlers.

pub mod context;
pub mod detect;
pub mod utility;

use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};

/// Read a text argument; `-` means stdin.
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
