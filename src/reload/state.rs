// reload/state.rs - 重載狀態保存

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

/// 狀態鍵值映射
pub type StateMap = serde_json::Map<String, Value>;

/// 可在重載間保存狀態的對象
///
/// 實現者自行決定導出哪些欄位；導入時對無法識別的鍵
/// 應靜默忽略，舊狀態缺失的欄位保持當前值。
pub trait ReloadableState {
    /// 導出當前狀態
    fn export_state(&self) -> StateMap;

    /// 從先前導出的狀態恢復
    fn import_state(&mut self, state: &StateMap);
}

/// 狀態倉庫
///
/// 按名稱保存導出的狀態映射，供重載完成後的新實例恢復。
pub struct StateStore {
    states: Mutex<HashMap<String, StateMap>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// 保存對象的當前狀態
    pub fn preserve(&self, name: &str, object: &dyn ReloadableState) {
        self.states
            .lock()
            .insert(name.to_string(), object.export_state());
    }

    /// 將先前保存的狀態恢復到對象上
    ///
    /// 找到並恢復時返回 true；保存的狀態在恢復後被移除。
    pub fn restore(&self, name: &str, object: &mut dyn ReloadableState) -> bool {
        match self.states.lock().remove(name) {
            Some(state) => {
                object.import_state(&state);
                true
            }
            None => false,
        }
    }

    /// 是否存在指定名稱的保存狀態
    pub fn contains(&self, name: &str) -> bool {
        self.states.lock().contains_key(name)
    }

    /// 清空所有保存的狀態
    pub fn clear(&self) {
        self.states.lock().clear();
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
