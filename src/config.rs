/// 配置管理模組
///
/// 本模組負責加載、驗證和管理應用配置。
/// 配置來源分層：內建默認值、JSON 配置文件、GNSS 前綴環境變數。
// 宣告子模組
pub mod loader;
pub mod manager;
pub mod types;
pub mod validation;

use thiserror::Error;

// 重新導出常用組件
pub use loader::ConfigLoader;
pub use manager::ConfigManager;
pub use types::*;
pub use validation::{ValidationError, Validator};

/// 配置子系統錯誤
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件 IO 錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置解析錯誤: {0}")]
    Json(#[from] serde_json::Error),

    #[error("配置分層錯誤: {0}")]
    Layering(#[from] config::ConfigError),

    #[error("配置驗證失敗: {0}")]
    Validation(#[from] ValidationError),

    #[error("無效的配置鍵: {0}")]
    InvalidKey(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
