use std::io;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, LevelFilter};

mod aggregate;
mod console;
mod datetime;
mod entries_api;
mod html_report;
mod report_command;
mod time_entry;
mod viewer;

use console::ConsoleProgress;
use entries_api::TimeEntriesClient;
use report_command::{ReportArgs, ReportCommand};
use viewer::SystemViewer;

/// 従業員のタイムエントリーを集計し、HTMLレポートを出力するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ TIME_ENTRIES_URL=https://example.com/api/gettimeentries cargo run
/// $ cargo run -- --url https://example.com/api/gettimeentries --no-open
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(flatten)]
    report: ReportArgs,

    #[clap(short = 'v', long = "verbose", help = "Enable debug logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    setup_logger(level)?;

    if let Err(err) = run(args.report).await {
        error!("{:?}", err);
        println!("❌ Error: {:#}", err);
        std::process::exit(1);
    }

    Ok(())
}

/// レポートを作成する。
async fn run(args: ReportArgs) -> Result<()> {
    let client = TimeEntriesClient::new(args.url.clone())
        .context("Failed to new time entries client")?;
    let mut stdout = io::stdout();
    let mut presenter = ConsoleProgress::new(&mut stdout);

    ReportCommand::new(&client, &SystemViewer, &mut presenter)
        .run(&args)
        .await?;

    Ok(())
}

/// ログを標準エラー出力に出力するように設定する。
fn setup_logger(level: LevelFilter) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for(env!("CARGO_CRATE_NAME"), level)
        .chain(io::stderr())
        .apply()
        .context("Failed to set up logger")?;

    Ok(())
}
