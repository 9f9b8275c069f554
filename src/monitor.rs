// monitor.rs - 監控系統模組

pub mod component;
pub mod errors;
pub mod logging;
pub mod perf;

// 重新導出常用元素，使其可直接從 monitor 模組使用
pub use component::MonitorComponent;
pub use errors::{ErrorAggregator, ErrorDetail, ErrorSummary};
pub use logging::init_logging;
pub use perf::{OperationStats, PerformanceTracker};

/// 監控系統錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// 日誌系統初始化錯誤
    #[error("日誌初始化錯誤: {0}")]
    Logger(String),

    /// IO 錯誤
    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),
}

/// 監控結果類型
pub type MonitorResult<T> = Result<T, MonitorError>;
