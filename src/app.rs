// 應用框架模組
//
// 提供應用生命週期管理：元件註冊、啟動、主循環與關閉。
// 核心服務（事件匯流排、模擬時鐘、配置管理器）由應用持有並注入元件。

pub mod component;
pub mod framework;
pub mod perf;

use thiserror::Error;

pub use component::{Component, SharedComponent};
pub use framework::Application;
pub use perf::PerformanceMonitor;

use crate::config::ConfigError;

/// 應用框架錯誤
#[derive(Debug, Error)]
pub enum AppError {
    /// 同名元件已存在
    #[error("元件 {0} 已註冊")]
    DuplicateComponent(String),

    #[error("配置錯誤: {0}")]
    Config(#[from] ConfigError),
}

pub type AppResult<T> = Result<T, AppError>;
