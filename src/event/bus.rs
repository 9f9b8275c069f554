// event/bus.rs - 執行緒安全的事件匯流排
//
// 鎖紀律：訂閱者映射與歷史緩衝的所有變更都在單一互斥鎖內完成；
// 回調的調用發生在鎖外（先在鎖內複製訂閱快照，釋放後再逐一調用），
// 因此回調內再次呼叫 publish / subscribe / unsubscribe 不會死鎖。
// 投遞期間的訂閱變更只影響後續的發佈，不影響當次快照。
//
// 事件類型僅做完整字串比對；點分層級名稱不展開萬用字元，
// 含 "*" 的類型會被當作字面鍵處理。

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

use crate::event::types::{
    Event, EventBusConfig, EventBusStats, EventCallback, EventFilter, EventSubscription,
    SubscriptionId,
};

/// 非同步發佈請求
struct AsyncPublish {
    event_type: String,
    data: Value,
    source: String,
}

/// 匯流排內部狀態，受單一互斥鎖保護
struct BusState {
    /// 事件類型 -> 按優先級降序排列的訂閱列表
    subscribers: HashMap<String, Vec<Arc<EventSubscription>>>,
    /// 有界歷史緩衝（FIFO 淘汰）
    history: VecDeque<Arc<Event>>,
    max_history: usize,
    /// 各事件類型最近一次的處理耗時（秒）
    processing_secs: HashMap<String, f64>,
    total_events: u64,
}

/// 匯流排核心，發佈邏輯集中於此以便與背景工作執行緒共享
struct BusCore {
    state: Mutex<BusState>,
}

impl BusCore {
    fn new(config: &EventBusConfig) -> Self {
        Self {
            state: Mutex::new(BusState {
                subscribers: HashMap::new(),
                history: VecDeque::new(),
                max_history: config.max_history,
                processing_secs: HashMap::new(),
                total_events: 0,
            }),
        }
    }

    /// 同步發佈：寫入歷史、快照訂閱者、鎖外按優先級調用回調
    fn publish(&self, event_type: &str, data: Value, source: &str) {
        let started = Instant::now();
        let event = Arc::new(Event::new(event_type, data, source));

        // 寫入歷史並取得訂閱快照
        let snapshot = {
            let mut state = self.state.lock();
            state.history.push_back(Arc::clone(&event));
            while state.history.len() > state.max_history {
                state.history.pop_front();
            }
            state
                .subscribers
                .get(event_type)
                .cloned()
                .unwrap_or_default()
        };

        // 鎖外調用回調；單一訂閱者的恐慌被隔離，不中斷後續投遞
        for subscription in &snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| {
                let pass = subscription
                    .filter
                    .as_ref()
                    .map_or(true, |filter| filter(&event));
                if pass {
                    (subscription.callback)(&event);
                }
            }));
            if result.is_err() {
                error!(
                    event_type = %event.event_type,
                    subscription_id = %subscription.subscription_id,
                    "事件回調發生恐慌，已隔離並繼續投遞"
                );
            }
        }

        // 更新統計
        let duration = started.elapsed().as_secs_f64();
        let mut state = self.state.lock();
        state
            .processing_secs
            .insert(event_type.to_string(), duration);
        state.total_events += 1;
    }
}

/// 執行緒安全的事件匯流排
///
/// 所有共享狀態由實例自身的鎖保護，獨立實例之間不會互相競爭。
pub struct EventBus {
    core: Arc<BusCore>,
    /// 非同步發佈佇列的發送端；工作執行緒啟動失敗時為 None
    async_tx: Option<Sender<AsyncPublish>>,
    worker: Option<JoinHandle<()>>,
}

impl EventBus {
    /// 以默認配置創建事件匯流排
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 以指定配置創建事件匯流排
    pub fn with_config(config: EventBusConfig) -> Self {
        let core = Arc::new(BusCore::new(&config));

        let (tx, rx) = channel::unbounded::<AsyncPublish>();
        let worker_core = Arc::clone(&core);
        let spawned = std::thread::Builder::new()
            .name("event-bus-async".to_string())
            .spawn(move || {
                for request in rx {
                    worker_core.publish(&request.event_type, request.data, &request.source);
                }
            });

        match spawned {
            Ok(handle) => Self {
                core,
                async_tx: Some(tx),
                worker: Some(handle),
            },
            Err(e) => {
                // 工作執行緒啟動失敗時退化為同步發佈
                error!("無法啟動非同步發佈執行緒: {}", e);
                Self {
                    core,
                    async_tx: None,
                    worker: None,
                }
            }
        }
    }

    /// 訂閱指定事件類型（優先級 0，無過濾器）
    ///
    /// 返回新的訂閱識別碼。任何字串（包括空字串）都是合法的事件類型，
    /// 一律作為字面鍵處理。
    pub fn subscribe(
        &self,
        event_type: &str,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribe_with(event_type, 0, None, Box::new(callback))
    }

    /// 以優先級與可選過濾器訂閱指定事件類型
    ///
    /// 同一事件類型的訂閱列表始終按優先級降序排列；
    /// 相同優先級按插入順序（穩定排序）。
    pub fn subscribe_with(
        &self,
        event_type: &str,
        priority: i32,
        filter: Option<EventFilter>,
        callback: EventCallback,
    ) -> SubscriptionId {
        let subscription_id = Uuid::new_v4();
        let subscription = Arc::new(EventSubscription {
            subscription_id,
            event_type: event_type.to_string(),
            priority,
            callback,
            filter,
        });

        let mut state = self.core.state.lock();
        let list = state
            .subscribers
            .entry(event_type.to_string())
            .or_default();
        list.push(subscription);
        list.sort_by(|a, b| b.priority.cmp(&a.priority));

        subscription_id
    }

    /// 依識別碼取消訂閱
    ///
    /// 找到並移除時返回 true，否則返回 false（冪等，重複取消不是錯誤）。
    pub fn unsubscribe(&self, subscription_id: SubscriptionId) -> bool {
        let mut state = self.core.state.lock();
        for list in state.subscribers.values_mut() {
            if let Some(index) = list
                .iter()
                .position(|s| s.subscription_id == subscription_id)
            {
                list.remove(index);
                return true;
            }
        }
        false
    }

    /// 同步發佈事件給所有匹配的訂閱者
    ///
    /// 訂閱者按優先級降序依次調用；回調中的恐慌被捕獲並記錄，
    /// 不會傳播給發佈者，也不會中斷對其餘訂閱者的投遞。
    pub fn publish(&self, event_type: &str, data: Value, source: &str) {
        self.core.publish(event_type, data, source);
    }

    /// 非同步發佈（即發即忘）
    ///
    /// 將發佈請求排入背景工作執行緒後立即返回。
    /// 不保證與其他非同步發佈之間的順序，也不保證在關閉前完成。
    pub fn publish_async(&self, event_type: &str, data: Value, source: &str) {
        match &self.async_tx {
            Some(tx) => {
                let request = AsyncPublish {
                    event_type: event_type.to_string(),
                    data,
                    source: source.to_string(),
                };
                if tx.send(request).is_err() {
                    warn!(event_type, "非同步發佈佇列已關閉，事件被丟棄");
                }
            }
            // 無工作執行緒時退化為同步發佈
            None => self.core.publish(event_type, data, source),
        }
    }

    /// 獲取事件歷史
    ///
    /// 返回最多 `limit` 筆最近的事件，可按事件類型過濾；
    /// 結果按時間順序排列（最舊的在前）。
    pub fn get_history(&self, event_type: Option<&str>, limit: usize) -> Vec<Arc<Event>> {
        let state = self.core.state.lock();
        let matched: Vec<Arc<Event>> = state
            .history
            .iter()
            .filter(|e| event_type.map_or(true, |t| e.event_type == t))
            .cloned()
            .collect();
        let skip = matched.len().saturating_sub(limit);
        matched.into_iter().skip(skip).collect()
    }

    /// 清空事件歷史
    pub fn clear_history(&self) {
        self.core.state.lock().history.clear();
    }

    /// 獲取統計資訊
    pub fn get_stats(&self) -> EventBusStats {
        let state = self.core.state.lock();
        let total_subscriptions = state.subscribers.values().map(Vec::len).sum();
        let avg_processing_secs = if state.processing_secs.is_empty() {
            0.0
        } else {
            state.processing_secs.values().sum::<f64>() / state.processing_secs.len() as f64
        };
        EventBusStats {
            total_events: state.total_events,
            event_types: state.subscribers.len(),
            total_subscriptions,
            processing_by_type: state.processing_secs.clone(),
            avg_processing_secs,
        }
    }

    /// 獲取指定事件類型目前的訂閱數量
    pub fn subscription_count(&self, event_type: &str) -> usize {
        self.core
            .state
            .lock()
            .subscribers
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        // 關閉佇列讓工作執行緒結束；排隊中的請求盡力送達
        drop(self.async_tx.take());
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
