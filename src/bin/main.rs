use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tokio::signal;
use tracing::{info, warn};

use gnss_demo_core::app::Application;
use gnss_demo_core::config::ConfigManager;
use gnss_demo_core::monitor::{init_logging, MonitorComponent};
use gnss_demo_core::reload::HotReloadManager;

/// GNSS 互動演示核心
#[derive(Debug, Parser)]
#[command(name = "gnss_demo", version, about)]
struct Args {
    /// 配置文件路徑
    #[arg(long, default_value = "config/app_config.json")]
    config: String,

    /// 控制台日誌級別（覆蓋配置文件）
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化配置
    let config = ConfigManager::new(&args.config)
        .with_context(|| format!("無法載入配置文件: {}", args.config))?;
    if let Some(level) = &args.log_level {
        config
            .set("logging.console_level", json!(level))
            .context("無效的日誌級別")?;
    }

    // 初始化日誌系統（guard 需持有到程序結束）
    let logging_config = config.typed()?.logging;
    let _log_guard = init_logging(&logging_config)?;

    // 組裝應用與內建元件
    let app = Arc::new(Application::new(Arc::new(config)));
    app.register_component("monitor", Box::new(MonitorComponent::new()))?;
    app.register_component("hot_reload", Box::new(HotReloadManager::new()))?;

    if !app.startup() {
        warn!("部分元件初始化失敗，應用以降級狀態繼續運行");
    }
    app.clock().play();

    // 主循環放在獨立執行緒，讓 tokio 負責等待關閉信號
    let loop_app = Arc::clone(&app);
    let main_loop = std::thread::Builder::new()
        .name("main-loop".to_string())
        .spawn(move || loop_app.run())
        .context("無法啟動主循環執行緒")?;

    match signal::ctrl_c().await {
        Ok(()) => info!("接收到關閉信號，正在退出..."),
        Err(e) => warn!("無法監聽關閉信號: {}", e),
    }

    app.request_shutdown();
    if main_loop.join().is_err() {
        warn!("主循環執行緒異常退出");
    }

    Ok(())
}
