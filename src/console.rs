use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Consoleにレポート作成の進捗を表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムエントリーの取得開始を表示する。
    fn show_fetching(&mut self) -> Result<()>;

    /// 集計するタイムエントリーの件数を表示する。
    ///
    /// # Arguments
    ///
    /// * `count` - 取得したタイムエントリーの件数
    fn show_processing(&mut self, count: usize) -> Result<()>;

    /// レポートの出力先と従業員数を表示する。
    ///
    /// # Arguments
    ///
    /// * `path` - 出力したレポートのパス
    /// * `employees` - レポートに含まれる従業員数
    fn show_report_written(&mut self, path: &Path, employees: usize) -> Result<()>;

    /// レポートをブラウザで開いたことを表示する。
    fn show_viewer_opened(&mut self) -> Result<()>;

    /// レポートを手動で開くように案内する。
    fn show_open_manually(&mut self, path: &Path) -> Result<()>;
}

/// 進捗を1行ずつ出力する。
pub struct ConsoleProgress<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleProgress<'a, W> {
    /// 新しい`ConsoleProgress`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }

    fn line(&mut self, message: String) -> Result<()> {
        writeln!(self.writer, "{}", message)
            .with_context(|| format!("Failed to write progress: {}", message))
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleProgress<'a, W> {
    fn show_fetching(&mut self) -> Result<()> {
        self.line("🔄 Fetching employee time data...".to_string())
    }

    fn show_processing(&mut self, count: usize) -> Result<()> {
        self.line(format!("📊 Processing {} time entries...", count))
    }

    fn show_report_written(&mut self, path: &Path, employees: usize) -> Result<()> {
        self.line(format!("✅ HTML report generated: {}", path.display()))?;
        self.line(format!("📈 Report includes {} employees", employees))
    }

    fn show_viewer_opened(&mut self) -> Result<()> {
        self.line("🌐 Report opened in browser".to_string())
    }

    fn show_open_manually(&mut self, path: &Path) -> Result<()> {
        self.line(format!(
            "💡 Please open {} in your browser to view the report",
            path.display()
        ))
    }
}
