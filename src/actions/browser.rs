use std::process::Command;

use anyhow::{Context, Result};

/// Open a URL in the default browser.
pub fn open_in_browser(url: &str) -> Result<()> {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "linux") {
        "xdg-open"
    } else {
        anyhow::bail!("Browser open not supported on this platform");
    };

    let status = Command::new(program)
        .arg(url)
        .status()
        .with_context(|| format!("Failed to run {program}"))?;
    if status.success() {
        Ok(())
    } else {
        anyhow::bail!("Browser command exited with {status}")
    }
}
