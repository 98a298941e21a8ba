use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use brazil_cds::config::ApplicationConfig;
use brazil_cds::data_ingestion::{CdsUpdater, UpdateError};
use brazil_cds::monitor::init_logging;
use brazil_cds::storage::{self, StorageBackend};
use clap::Parser;
use tracing::error;

#[derive(Parser)]
#[command(name = "update", about = "抓取最新的巴西 CDS 歷史資料並寫入儲存")]
struct Cli {
    /// 只抓取並輸出解析結果，不寫入儲存
    #[arg(long)]
    dry_run: bool,

    /// 覆寫配置的儲存後端 (csv 或 postgres)
    #[arg(long, value_parser = parse_backend)]
    backend: Option<StorageBackend>,
}

fn parse_backend(value: &str) -> Result<StorageBackend, String> {
    value.parse().map_err(|e: storage::StorageError| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let app_config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("更新失敗: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // 守衛需存活到錯誤寫入日誌之後
    let _log_guard = match init_logging(&app_config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("無法初始化日誌: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, app_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.downcast_ref::<UpdateError>().map_or(1, UpdateError::exit_code);
            error!("更新失敗: {:#}", e);
            eprintln!("更新失敗: {:#}", e);
            ExitCode::from(code as u8)
        }
    }
}

fn load_config(cli: &Cli) -> Result<ApplicationConfig> {
    let mut app_config = ApplicationConfig::load_from_env().context("無法載入配置")?;
    if let Some(backend) = cli.backend {
        app_config.storage.backend = backend.to_string();
    }
    Ok(app_config)
}

async fn run(cli: Cli, app_config: ApplicationConfig) -> Result<()> {
    let updater = CdsUpdater::from_config(&app_config.scraper).map_err(UpdateError::from)?;

    if cli.dry_run {
        updater.preview(io::stdout()).await?;
        return Ok(());
    }

    let storage = storage::open_storage(&app_config)
        .await
        .map_err(UpdateError::from)?;
    let result = updater.run(storage.as_ref()).await;
    storage.close().await;
    let report = result?;

    println!("儲存後端: {}", storage.backend());
    println!("擷取策略: {}", report.strategy);
    println!("擷取筆數: {}", report.scraped);
    println!("寫入筆數: {}", report.stored);
    println!("總筆數: {}", report.stats.total_records);
    if let (Some(oldest), Some(latest)) = (report.stats.oldest_date, report.stats.latest_date) {
        println!("日期範圍: {} ~ {}", oldest, latest);
    }
    if let Some(close) = report.stats.latest_close {
        println!("最新收盤: {}", close);
    }

    Ok(())
}
