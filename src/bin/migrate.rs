use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use brazil_cds::config::ApplicationConfig;
use brazil_cds::data_ingestion::validate_csv;
use brazil_cds::domain_types::merge_and_dedup;
use brazil_cds::monitor::init_logging;
use brazil_cds::storage::{self, CdsDatabase, CdsStorage, CsvStorage, PgCdsRepository};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "migrate", about = "brazil_cds 數據庫遷移工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 運行所有未應用的遷移
    Run,

    /// 檢查遷移狀態
    Status,

    /// 將 CSV 檔案匯入 PostgreSQL
    ImportCsv {
        /// CSV 檔案路徑，預設為 storage.csv_path
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// 資料庫已有資料時不詢問直接覆寫
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行參數
    let cli = Cli::parse();

    let app_config = ApplicationConfig::load_from_env().context("無法載入配置")?;
    let _log_guard = init_logging(&app_config.log)?;

    let db = CdsDatabase::connect(&app_config.database)
        .await
        .context("無法初始化資料庫連接池")?;

    // 執行命令
    let result = match cli.command {
        Commands::Run => run(&db).await,
        Commands::Status => status(&db).await,
        Commands::ImportCsv { path, yes } => {
            let path = path.unwrap_or_else(|| app_config.storage.csv_path.clone());
            import_csv(&db, &path, yes).await
        }
    };

    db.close().await;
    result
}

async fn run(db: &CdsDatabase) -> Result<()> {
    info!("開始運行資料庫遷移...");
    storage::run_migrations(db.pool())
        .await
        .context("資料庫遷移執行失敗")?;
    info!("資料庫遷移完成！");
    Ok(())
}

async fn status(db: &CdsDatabase) -> Result<()> {
    let applied = storage::applied_migrations(db.pool())
        .await
        .context("無法查詢遷移狀態")?;

    println!("{:<16} {:<8} {:<26} 描述", "版本", "狀態", "套用時間");
    for (version, description) in storage::known_migrations() {
        match applied.iter().find(|m| m.version == version) {
            Some(m) => println!(
                "{:<16} {:<8} {:<26} {}",
                version,
                if m.success { "已套用" } else { "失敗" },
                m.installed_on.format("%Y-%m-%d %H:%M:%S %Z"),
                description
            ),
            None => println!("{:<16} {:<8} {:<26} {}", version, "待套用", "-", description),
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} (y/n): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

async fn import_csv(db: &CdsDatabase, path: &Path, yes: bool) -> Result<()> {
    if !path.exists() {
        bail!("找不到 CSV 檔案: {}", path.display());
    }

    info!("驗證 CSV 資料: {}", path.display());
    let report = validate_csv(File::open(path)?).context("無法讀取 CSV")?;
    println!("{report}");
    if !report.is_valid() {
        bail!("CSV 驗證失敗，已中止匯入");
    }
    if report.total_rows == 0 {
        warn!("CSV 檔案沒有資料，無需匯入");
        return Ok(());
    }

    let records = CsvStorage::new(path).load_data()?;
    let unique = merge_and_dedup(Vec::new(), records);
    info!("讀取 {} 筆記錄 (去重後)", unique.len());

    storage::run_migrations(db.pool()).await?;
    let repo = PgCdsRepository::new(db.clone());

    let existing = repo.count().await?;
    if existing > 0 && !yes {
        warn!("資料庫已有 {} 筆記錄", existing);
        if !confirm("繼續匯入將覆寫相同日期的記錄，是否繼續?")? {
            info!("使用者取消匯入");
            return Ok(());
        }
    }

    let count = repo.upsert(&unique).await?;
    info!("已匯入 {} 筆記錄", count);

    verify(&repo, &unique).await
}

/// 比對 CSV 與資料庫的筆數與日期
async fn verify(repo: &PgCdsRepository, csv_records: &[brazil_cds::domain_types::CdsRecord]) -> Result<()> {
    let db_records = repo.load_existing().await?;

    let csv_dates: BTreeSet<_> = csv_records.iter().map(|r| r.date).collect();
    let db_dates: BTreeSet<_> = db_records.iter().map(|r| r.date).collect();

    println!("CSV 記錄數: {}", csv_dates.len());
    println!("資料庫記錄數: {}", db_dates.len());
    if let (Some(first), Some(last)) = (csv_dates.first(), csv_dates.last()) {
        println!("CSV 日期範圍: {first} ~ {last}");
    }
    if let Some((first, last)) = repo.date_range().await? {
        println!("資料庫日期範圍: {first} ~ {last}");
    }

    let missing_in_db = csv_dates.difference(&db_dates).count();
    let extra_in_db = db_dates.difference(&csv_dates).count();
    if missing_in_db > 0 {
        bail!("{} 個 CSV 日期不在資料庫中", missing_in_db);
    }
    if extra_in_db > 0 {
        warn!("資料庫有 {} 個日期不在 CSV 中", extra_in_db);
    } else {
        info!("所有日期均已同步");
    }
    Ok(())
}
