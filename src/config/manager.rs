use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::loader::ConfigLoader;
use crate::config::types::ApplicationConfig;
use crate::config::{ConfigError, ConfigResult};

/// 配置管理器
///
/// 持有載入後的配置樹，提供點分路徑的讀寫接口。
/// 每個管理器是獨立實例，由構造方注入到需要配置的組件中。
pub struct ConfigManager {
    path: Option<PathBuf>,
    data: RwLock<Value>,
}

impl ConfigManager {
    /// 從配置文件創建管理器（文件不存在時自動生成默認配置）
    pub fn new(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = ConfigLoader::load(&path)?;
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// 以內建默認值創建管理器，不關聯任何文件
    pub fn with_defaults() -> Self {
        Self {
            path: None,
            data: RwLock::new(ConfigLoader::defaults()),
        }
    }

    /// 按點分路徑讀取配置值並反序列化
    ///
    /// 路徑不存在或類型不符時返回 None。
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = self.data.read();
        let value = lookup(&data, key)?.clone();
        serde_json::from_value(value).ok()
    }

    /// 按點分路徑讀取配置值，不存在時返回給定默認值
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// 按點分路徑寫入配置值
    ///
    /// 先在配置樹副本上套用變更並做整樹驗證，
    /// 驗證失敗時返回錯誤且不改變當前配置。
    pub fn set(&self, key: &str, value: Value) -> ConfigResult<()> {
        let mut candidate = self.data.read().clone();
        insert(&mut candidate, key, value)?;
        ConfigLoader::validate_tree(&candidate)?;

        *self.data.write() = candidate;
        Ok(())
    }

    /// 檢查點分路徑是否存在
    pub fn has_key(&self, key: &str) -> bool {
        lookup(&self.data.read(), key).is_some()
    }

    /// 獲取整棵配置樹的副本
    pub fn get_all(&self) -> Value {
        self.data.read().clone()
    }

    /// 將當前配置樹反序列化為類型化結構
    pub fn typed(&self) -> ConfigResult<ApplicationConfig> {
        let data = self.data.read().clone();
        Ok(serde_json::from_value(data)?)
    }

    /// 將當前配置保存回關聯的文件（無關聯文件時為空操作）
    pub fn save(&self) -> ConfigResult<()> {
        if let Some(path) = &self.path {
            let content = serde_json::to_string_pretty(&*self.data.read())?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

/// 沿點分路徑查找節點
fn lookup<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = tree;
    for segment in key.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// 沿點分路徑寫入節點，必要時創建中間物件
fn insert(tree: &mut Value, key: &str, value: Value) -> ConfigResult<()> {
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(ConfigError::InvalidKey(key.to_string()));
    }

    let mut current = tree;
    let segments: Vec<&str> = key.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        let map = current
            .as_object_mut()
            .ok_or_else(|| ConfigError::InvalidKey(key.to_string()))?;
        if i == segments.len() - 1 {
            map.insert(segment.to_string(), value);
            return Ok(());
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(())
}
