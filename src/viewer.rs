use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
#[cfg(test)]
use mockall::automock;

/// 出力したレポートを開くためのtrait。
#[cfg_attr(test, automock)]
pub trait ReportViewer {
    /// レポートを開く。
    fn open(&self, path: &Path) -> Result<()>;
}

/// OS既定のアプリケーションでレポートを開く。
pub struct SystemViewer;

impl SystemViewer {
    /// OSごとの起動コマンドを返す。
    fn command(path: &Path) -> Command {
        if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg(path);
            command
        } else if cfg!(target_os = "windows") {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(path);
            command
        } else {
            let mut command = Command::new("xdg-open");
            command.arg(path);
            command
        }
    }
}

impl ReportViewer for SystemViewer {
    fn open(&self, path: &Path) -> Result<()> {
        let mut command = Self::command(path);
        let status = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to launch viewer: {:?}", command.get_program()))?;
        if !status.success() {
            bail!("Viewer exited with {}", status);
        }

        Ok(())
    }
}
