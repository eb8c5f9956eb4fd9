//! OS collaborators: interactive region capture and revealing the result.

use crate::fsutil::ensure_parent_dir;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

const REVEAL_TIMEOUT: Duration = Duration::from_secs(10);

pub trait CaptureShell {
    /// Lets the user pick a screen region and writes it to `path` as PNG.
    fn capture_region_to_file(&self, path: &Path) -> Result<()>;

    /// Shows `path` in the platform file browser.
    fn reveal_in_file_browser(&self, path: &Path) -> Result<()>;
}

/// `screencapture`/`open` on macOS, `gnome-screenshot` or `grim`+`slurp`
/// and `xdg-open` on Linux.
pub struct SystemShell;

impl CaptureShell for SystemShell {
    fn capture_region_to_file(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let mut cmd = capture_command(path)?;
        log::debug!("capture command: {cmd:?}");
        let status = cmd
            .status()
            .with_context(|| format!("failed to launch capture tool: {cmd:?}"))?;
        if !status.success() {
            bail!(
                "capture tool exited with status {}",
                status.code().unwrap_or(1)
            );
        }
        if !path.exists() {
            bail!("no region captured; selection was cancelled");
        }
        Ok(())
    }

    fn reveal_in_file_browser(&self, path: &Path) -> Result<()> {
        let mut cmd = reveal_command(path)?;
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to launch file browser: {cmd:?}"))?;
        match child.wait_timeout(REVEAL_TIMEOUT)? {
            Some(status) if status.success() => Ok(()),
            Some(status) => bail!(
                "file browser exited with status {}",
                status.code().unwrap_or(1)
            ),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                bail!(
                    "file browser did not respond within {}s",
                    REVEAL_TIMEOUT.as_secs()
                )
            }
        }
    }
}

fn capture_command(path: &Path) -> Result<Command> {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("screencapture");
        cmd.args(["-i", "-x", "-t", "png"]).arg(path);
        return Ok(cmd);
    }
    if command_exists("gnome-screenshot") {
        let mut cmd = Command::new("gnome-screenshot");
        cmd.arg("-a").arg("-f").arg(path);
        return Ok(cmd);
    }
    if command_exists("grim") && command_exists("slurp") {
        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(r#"region="$(slurp)" || exit 1; grim -t png -g "$region" "$1""#)
            .arg("snapframe")
            .arg(path);
        return Ok(cmd);
    }
    bail!("no supported screen capture tool found (screencapture, gnome-screenshot, grim+slurp)")
}

fn reveal_command(path: &Path) -> Result<Command> {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg("-R").arg(path);
        return Ok(cmd);
    }
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("explorer");
        cmd.arg(format!("/select,{}", path.display()));
        return Ok(cmd);
    }
    if command_exists("xdg-open") {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut cmd = Command::new("xdg-open");
        cmd.arg(dir);
        return Ok(cmd);
    }
    bail!("no file browser launcher found")
}

pub fn command_exists(name: &str) -> bool {
    Command::new("bash")
        .arg("-lc")
        .arg(r#"command -v "$1" >/dev/null 2>&1"#)
        .arg("bash")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
