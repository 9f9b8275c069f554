// event/types.rs - 事件系統核心類型

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// 事件回調類型，接收事件的只讀引用
pub type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;

/// 事件過濾器類型，返回 true 表示事件應投遞給該訂閱者
pub type EventFilter = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// 訂閱識別碼
pub type SubscriptionId = Uuid;

/// 事件資料結構
///
/// 事件在 `publish` 時創建一次，之後不再變更；
/// 由歷史緩衝區持有，並以只讀引用傳遞給各訂閱者回調。
#[derive(Debug, Clone)]
pub struct Event {
    /// 事件類型（點分層級命名，例如 "time.changed"）
    pub event_type: String,
    /// 事件負載（不透明，通常為鍵值映射）
    pub data: Value,
    /// 事件來源標籤
    pub source: String,
    /// 創建時間
    pub timestamp: DateTime<Utc>,
    /// 全局唯一事件識別碼
    pub event_id: Uuid,
}

impl Event {
    /// 創建新的事件
    pub fn new(event_type: &str, data: Value, source: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            data,
            source: source.to_string(),
            timestamp: Utc::now(),
            event_id: Uuid::new_v4(),
        }
    }
}

/// 訂閱元數據
///
/// 由 `subscribe` 創建、`unsubscribe` 銷毀；註冊完成後僅由
/// 匯流排的每類型有序列表持有，外部只保留返回的識別碼。
pub struct EventSubscription {
    /// 訂閱識別碼
    pub subscription_id: SubscriptionId,
    /// 訂閱的事件類型（完整字串比對）
    pub event_type: String,
    /// 優先級，數值越大越先被調用
    pub priority: i32,
    /// 事件回調
    pub(crate) callback: EventCallback,
    /// 可選的事件過濾器
    pub(crate) filter: Option<EventFilter>,
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("subscription_id", &self.subscription_id)
            .field("event_type", &self.event_type)
            .field("priority", &self.priority)
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

/// 事件匯流排配置
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 歷史緩衝區上限，超過時淘汰最舊的事件
    pub max_history: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { max_history: 1000 }
    }
}

/// 事件匯流排統計資訊
#[derive(Debug, Clone)]
pub struct EventBusStats {
    /// 已發佈的事件總數
    pub total_events: u64,
    /// 有訂閱者的事件類型數量
    pub event_types: usize,
    /// 目前的訂閱總數
    pub total_subscriptions: usize,
    /// 各事件類型最近一次的處理耗時（秒）
    pub processing_by_type: HashMap<String, f64>,
    /// 平均處理耗時（秒）
    pub avg_processing_secs: f64,
}
