//! Local `git` and browser integration

use std::process::Command;

use anyhow::{Context, Result};

/// Name of the currently checked out git branch
pub fn current_branch() -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()
        .context("Failed to run git")?;

    if !output.status.success() {
        anyhow::bail!(
            "git rev-parse failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Checks out `branch`, creating it if it does not exist yet
pub fn checkout_branch(branch: &str) -> Result<()> {
    tracing::debug!(branch, "checking out git branch");
    let existing = Command::new("git")
        .args(["checkout", branch])
        .output()
        .context("Failed to run git checkout")?;
    if existing.status.success() {
        return Ok(());
    }

    let created = Command::new("git")
        .args(["checkout", "-b", branch])
        .output()
        .context("Failed to run git checkout -b")?;
    if !created.status.success() {
        anyhow::bail!(
            "Failed to check out branch {}: {}",
            branch,
            String::from_utf8_lossy(&created.stderr).trim()
        );
    }
    Ok(())
}

/// Opens `url` in the default browser
pub fn open_url(url: &str) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    tracing::debug!(opener, url, "opening url");

    let status = Command::new(opener)
        .arg(url)
        .status()
        .with_context(|| format!("Failed to run {}", opener))?;
    if !status.success() {
        anyhow::bail!("{} exited with {}", opener, status);
    }
    Ok(())
}
