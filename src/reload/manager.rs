// reload/manager.rs - 熱重載管理器
//
// 以元件身份掛載到應用上。初始化時從配置讀取開關與監視目錄，
// 文件變化透過非同步發佈通知，插件重載方監聽 "hot_reload.file_changed"
// 事件並配合狀態倉庫保存/恢復狀態。

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use crate::app::{Application, Component};
use crate::event::EventBus;
use crate::reload::state::StateStore;
use crate::reload::watcher::DirectoryWatcher;

/// 事件來源標籤
const SOURCE: &str = "HotReloadManager";

/// 監視輪詢間隔
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 熱重載統計
#[derive(Debug, Clone)]
pub struct ReloadStats {
    pub enabled: bool,
    pub detected_changes: u64,
    pub watched_directories: Vec<PathBuf>,
}

pub struct HotReloadManager {
    enabled: bool,
    watched_directories: Vec<PathBuf>,
    watcher: Option<DirectoryWatcher>,
    bus: Option<Arc<EventBus>>,
    store: Arc<StateStore>,
    detected_changes: Arc<AtomicU64>,
}

impl HotReloadManager {
    pub fn new() -> Self {
        Self {
            enabled: false,
            watched_directories: Vec::new(),
            watcher: None,
            bus: None,
            store: Arc::new(StateStore::new()),
            detected_changes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 重載間的狀態倉庫
    pub fn state_store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    /// 當前統計
    pub fn stats(&self) -> ReloadStats {
        ReloadStats {
            enabled: self.enabled,
            detected_changes: self.detected_changes.load(Ordering::Relaxed),
            watched_directories: self.watched_directories.clone(),
        }
    }

    /// 切換自動重載開關並發佈 "hot_reload.toggled" 事件
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            if let Some(mut watcher) = self.watcher.take() {
                watcher.stop();
            }
        } else if let Some(bus) = &self.bus {
            self.start_watcher(Arc::clone(bus));
        }
        if let Some(bus) = &self.bus {
            bus.publish("hot_reload.toggled", json!({ "enabled": enabled }), SOURCE);
        }
    }

    /// 啟動目錄監視；失敗時發佈錯誤事件但不中斷應用
    fn start_watcher(&mut self, bus: Arc<EventBus>) {
        let mut watcher =
            DirectoryWatcher::new(self.watched_directories.clone(), POLL_INTERVAL);

        let callback_bus = Arc::clone(&bus);
        let counter = Arc::clone(&self.detected_changes);
        let result = watcher.start(move |change| {
            counter.fetch_add(1, Ordering::Relaxed);
            callback_bus.publish_async(
                "hot_reload.file_changed",
                json!({ "path": change.path.display().to_string() }),
                SOURCE,
            );
        });

        match result {
            Ok(()) => {
                info!(
                    directories = ?self.watched_directories,
                    "熱重載監視已啟動"
                );
                self.watcher = Some(watcher);
            }
            Err(e) => {
                warn!("熱重載監視啟動失敗: {}", e);
                bus.publish(
                    "error.occurred",
                    json!({
                        "error_type": "hot_reload.watch",
                        "message": e.to_string(),
                    }),
                    SOURCE,
                );
            }
        }
    }
}

impl Default for HotReloadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HotReloadManager {
    fn initialize(&mut self, app: &Application) -> bool {
        let config = app.config();
        self.enabled = config.get_or("plugins.auto_reload", true);
        self.watched_directories = config
            .get_or("plugins.watch_directories", Vec::<String>::new())
            .into_iter()
            .map(PathBuf::from)
            .collect();

        let bus = Arc::clone(app.event_bus());
        if self.enabled {
            self.start_watcher(Arc::clone(&bus));
        }
        self.bus = Some(bus);

        // 監視啟動失敗不阻止應用啟動
        true
    }

    fn update(&mut self, _delta_time: f64) {}

    fn shutdown(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        self.bus = None;
    }
}
