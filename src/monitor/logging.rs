// monitor/logging.rs - 日誌系統初始化

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::monitor::{MonitorError, MonitorResult};

/// 日誌文件名
const LOG_FILE_PREFIX: &str = "gnss_demo.log";

/// 初始化日誌系統
///
/// 同時輸出到控制台與日誌文件（按天切割），兩個輸出使用各自的
/// 級別過濾。`RUST_LOG` 環境變數存在時優先於配置中的控制台級別。
/// 返回的 guard 必須在程序整個生命週期內持有，否則文件輸出會丟失。
pub fn init_logging(config: &LoggingConfig) -> MonitorResult<Option<WorkerGuard>> {
    std::fs::create_dir_all(&config.directory)?;

    let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.to_lowercase()));

    let console_layer = fmt::layer().with_filter(console_filter);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(parse_level(&config.file_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MonitorError::Logger(e.to_string()))?;

    info!("日誌系統初始化完成");
    Ok(Some(guard))
}

/// 將配置中的級別字串轉換為過濾器（無法識別時回落到 INFO）
fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}
