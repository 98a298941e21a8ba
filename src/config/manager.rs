use config::ConfigError;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::config::loader::{ConfigLoader, Environment};
use crate::config::types::ApplicationConfig;
use crate::config::validation::{ValidationError, Validator};

/// 配置加載錯誤
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("讀取配置失敗: {0}")]
    Source(#[from] ConfigError),

    #[error("配置驗證失敗: {0}")]
    Validation(#[from] ValidationError),
}

/// ApplicationConfig 加載方法實現
impl ApplicationConfig {
    /// 從環境變數指定的環境加載配置
    pub fn load_from_env() -> Result<Self, ConfigLoadError> {
        let env = Environment::from_env();
        debug!("從環境加載配置: {:?}", env);
        Self::load(env)
    }

    /// 從指定環境加載配置
    pub fn load(env: Environment) -> Result<Self, ConfigLoadError> {
        Self::finish(ConfigLoader::load(env)?)
    }

    /// 從指定目錄加載配置
    pub fn load_from_dir(env: Environment, config_dir: &Path) -> Result<Self, ConfigLoadError> {
        Self::finish(ConfigLoader::load_from_dir(env, config_dir)?)
    }

    fn finish(config_source: config::Config) -> Result<Self, ConfigLoadError> {
        // 使用 serde 反序列化配置
        let app_config: ApplicationConfig = config_source.try_deserialize()?;

        // 無效配置視為啟動錯誤
        app_config.validate()?;
        debug!("配置驗證通過");

        Ok(app_config)
    }
}
