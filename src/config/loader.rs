use config::{Config, ConfigError, Environment as ConfigEnvironment, File};
use std::env;
use std::path::Path;

/// 環境變數前綴，例如 `CDS__SCRAPER__URL`
pub const ENV_PREFIX: &str = "CDS";

/// 環境類型枚舉
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// 從環境變數 `CDS_ENV` 取得當前環境設定
    pub fn from_env() -> Self {
        Self::parse(&env::var("CDS_ENV").unwrap_or_else(|_| "development".into()))
    }

    /// 未知值視為開發環境
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// 轉換為配置文件名
    pub fn as_filename(&self) -> &'static str {
        match self {
            Environment::Development => "development.toml",
            Environment::Production => "production.toml",
        }
    }
}

/// 配置加載器，負責根據環境加載適當的配置
pub struct ConfigLoader;

impl ConfigLoader {
    /// 載入指定環境的配置，配置目錄取自 `CONFIG_DIR`（預設 `config`）
    pub fn load(env: Environment) -> Result<Config, ConfigError> {
        let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());
        Self::load_from_dir(env, Path::new(&config_dir))
    }

    /// 從指定目錄載入配置，環境配置文件不存在時僅使用預設值與環境變數
    pub fn load_from_dir(env: Environment, config_dir: &Path) -> Result<Config, ConfigError> {
        let config_path = config_dir.join(env.as_filename());

        let mut config_builder =
            Config::builder().set_default("app.environment", env.as_str())?;

        // 常見的連線字串環境變數作為資料庫網址預設值
        if let Some(url) = database_url_from_env() {
            config_builder = config_builder.set_default("database.url", url)?;
        }

        // 加載環境特定配置
        config_builder = config_builder.add_source(File::from(config_path).required(false));

        // 從環境變數加載配置（優先級高於文件配置）
        config_builder = config_builder.add_source(
            ConfigEnvironment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        // 構建最終配置
        config_builder.build()
    }

    /// 載入當前環境的配置
    pub fn load_current() -> Result<Config, ConfigError> {
        Self::load(Environment::from_env())
    }
}

fn database_url_from_env() -> Option<String> {
    ["DATABASE_URL", "POSTGRES_URL"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}
