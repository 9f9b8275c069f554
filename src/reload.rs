// 熱重載模組
//
// 監視插件目錄的文件變化，透過事件通知重載，
// 並在重載前後保存與恢復元件狀態。

pub mod manager;
pub mod state;
pub mod watcher;

use std::path::PathBuf;

use thiserror::Error;

pub use manager::{HotReloadManager, ReloadStats};
pub use state::{ReloadableState, StateMap, StateStore};
pub use watcher::{DirectoryWatcher, FileChange};

/// 熱重載錯誤類型
#[derive(Debug, Error)]
pub enum ReloadError {
    /// 監視路徑不存在
    #[error("監視路徑不存在: {0}")]
    PathNotFound(PathBuf),

    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReloadResult<T> = Result<T, ReloadError>;
