use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::aggregate::{aggregate, Ranking, TimestampPolicy};
use crate::console::ConsolePresenter;
use crate::entries_api::TimeEntryRepository;
use crate::html_report::HtmlReport;
use crate::viewer::ReportViewer;

/// レポート作成の引数。
#[derive(Debug, clap::Args)]
pub struct ReportArgs {
    #[clap(
        long = "url",
        value_name = "URL",
        help = "Time entries endpoint URL [default: $TIME_ENTRIES_URL]"
    )]
    pub url: Option<String>,

    #[clap(
        short = 'o',
        long = "output",
        value_name = "PATH",
        default_value = "EmployeeReport.html",
        help = "Path of the HTML report to write",
        parse(from_os_str)
    )]
    pub output: PathBuf,

    #[clap(long = "no-open", help = "Do not open the report after writing it")]
    pub no_open: bool,

    #[clap(
        long = "skip-invalid-timestamps",
        help = "Skip entries with unparsable timestamps instead of failing"
    )]
    pub skip_invalid_timestamps: bool,

    #[clap(
        long = "low-hours",
        value_name = "HOURS",
        default_value = "100",
        help = "Highlight employees with fewer total hours than this"
    )]
    pub low_hours: f64,
}

impl ReportArgs {
    fn timestamp_policy(&self) -> TimestampPolicy {
        if self.skip_invalid_timestamps {
            TimestampPolicy::Skip
        } else {
            TimestampPolicy::default()
        }
    }
}

/// タイムエントリーを集計してHTMLレポートを出力するコマンド。
pub struct ReportCommand<'a, R: TimeEntryRepository, V: ReportViewer, P: ConsolePresenter> {
    repository: &'a R,
    viewer: &'a V,
    presenter: &'a mut P,
}

impl<'a, R: TimeEntryRepository, V: ReportViewer, P: ConsolePresenter> ReportCommand<'a, R, V, P> {
    /// 新しい`ReportCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - タイムエントリーを取得するためのリポジトリ
    /// * `viewer` - 出力したレポートを開くためのビューア
    /// * `presenter` - 進捗を表示するためのプレゼンター
    pub fn new(repository: &'a R, viewer: &'a V, presenter: &'a mut P) -> Self {
        Self {
            repository,
            viewer,
            presenter,
        }
    }

    /// タイムエントリーを取得、集計し、HTMLレポートを出力する。
    ///
    /// 集計とHTMLの生成が成功した場合にのみファイルを書き込む。
    /// レポートを開けなかった場合はエラーにせず、手動で開くように案内する。
    ///
    /// # Arguments
    ///
    /// * `args` - レポート作成の引数
    pub async fn run(&mut self, args: &ReportArgs) -> Result<Ranking> {
        self.presenter.show_fetching()?;
        let time_entries = self
            .repository
            .read_time_entries()
            .await
            .context("Failed to retrieve time entries")?;
        info!("Time entries retrieved successfully.");
        self.presenter.show_processing(time_entries.len())?;

        let ranking = aggregate(&time_entries, args.timestamp_policy())
            .context("Failed to aggregate time entries")?;
        info!("Employees in report: {}", ranking.employees().len());

        let html = HtmlReport::new(&ranking)
            .low_hours_threshold(args.low_hours)
            .render();
        fs::write(&args.output, html)
            .with_context(|| format!("Failed to write report to {}", args.output.display()))?;
        info!("Report written to {}", args.output.display());
        self.presenter
            .show_report_written(&args.output, ranking.employees().len())?;

        if !args.no_open {
            match self.viewer.open(&args.output) {
                Ok(()) => self.presenter.show_viewer_opened()?,
                Err(err) => {
                    warn!("Failed to open report: {:#}", err);
                    self.presenter.show_open_manually(&args.output)?;
                }
            }
        }

        Ok(ranking)
    }
}
