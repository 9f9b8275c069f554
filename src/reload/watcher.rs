// reload/watcher.rs - 目錄變化監視
//
// 以輪詢方式掃描監視目錄的文件修改時間。同一文件的 mtime
// 未再變化時不會重複觸發回調。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::reload::{ReloadError, ReloadResult};

/// 單筆文件變化
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// 目錄監視器
///
/// 背景執行緒按固定間隔遞迴掃描監視目錄，
/// 對每個新增或修改的文件調用一次回調。
pub struct DirectoryWatcher {
    directories: Vec<PathBuf>,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    pub fn new(directories: Vec<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            directories,
            poll_interval,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// 啟動監視執行緒
    ///
    /// 任一監視目錄不存在時返回錯誤。啟動時先記錄基準掃描，
    /// 此後只對基準之後的變化觸發回調。
    pub fn start(&mut self, callback: impl Fn(FileChange) + Send + 'static) -> ReloadResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        for dir in &self.directories {
            if !dir.is_dir() {
                return Err(ReloadError::PathNotFound(dir.clone()));
            }
        }

        let directories = self.directories.clone();
        let poll_interval = self.poll_interval;
        let stop = Arc::clone(&self.stop);

        let handle = std::thread::Builder::new()
            .name("hot-reload-watcher".to_string())
            .spawn(move || {
                // 基準掃描：已存在的文件不觸發回調
                let mut seen: HashMap<PathBuf, SystemTime> = HashMap::new();
                for dir in &directories {
                    scan(dir, &mut seen, &mut Vec::new());
                }

                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(poll_interval);

                    let mut changes = Vec::new();
                    for dir in &directories {
                        scan(dir, &mut seen, &mut changes);
                    }
                    for change in changes {
                        debug!(path = %change.path.display(), "偵測到文件變化");
                        callback(change);
                    }
                }
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// 停止監視執行緒並等待其退出
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// 監視的目錄列表
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 遞迴掃描目錄，將新增或 mtime 更新的文件記入 changes
fn scan(dir: &Path, seen: &mut HashMap<PathBuf, SystemTime>, changes: &mut Vec<FileChange>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), "無法讀取監視目錄: {}", e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan(&path, seen, changes);
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        let is_new_or_updated = seen
            .get(&path)
            .map_or(true, |previous| modified > *previous);
        if is_new_or_updated {
            seen.insert(path.clone(), modified);
            changes.push(FileChange { path, modified });
        }
    }
}
