// 事件處理系統模組
//
// 本模組提供事件驅動架構，實現核心與各元件之間的解耦通信。
// 支持事件發佈/訂閱、優先級排序、過濾機制以及有界歷史緩衝。

pub mod bus;
pub mod types;

// 重新導出核心類型
pub use bus::EventBus;
pub use types::{
    Event, EventBusConfig, EventBusStats, EventCallback, EventFilter, EventSubscription,
    SubscriptionId,
};
