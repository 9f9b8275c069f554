// monitor/component.rs - 監控元件
//
// 以一般元件的身份掛載到應用上，訂閱錯誤與生命週期事件，
// 將 "error.occurred" 事件匯入錯誤聚合器並寫入日誌。

use std::sync::Arc;

use tracing::{error, info};

use crate::app::{Application, Component};
use crate::event::{EventBus, SubscriptionId};
use crate::monitor::errors::ErrorAggregator;
use crate::monitor::perf::PerformanceTracker;

pub struct MonitorComponent {
    aggregator: Arc<ErrorAggregator>,
    tracker: Arc<PerformanceTracker>,
    bus: Option<Arc<EventBus>>,
    subscriptions: Vec<SubscriptionId>,
}

impl MonitorComponent {
    pub fn new() -> Self {
        Self {
            aggregator: Arc::new(ErrorAggregator::new()),
            tracker: Arc::new(PerformanceTracker::new()),
            bus: None,
            subscriptions: Vec::new(),
        }
    }

    /// 錯誤聚合器（可在註冊前取出句柄以供查詢）
    pub fn error_aggregator(&self) -> Arc<ErrorAggregator> {
        Arc::clone(&self.aggregator)
    }

    /// 操作耗時追蹤器
    pub fn performance_tracker(&self) -> Arc<PerformanceTracker> {
        Arc::clone(&self.tracker)
    }
}

impl Default for MonitorComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for MonitorComponent {
    fn initialize(&mut self, app: &Application) -> bool {
        let bus = Arc::clone(app.event_bus());

        // 錯誤事件：匯入聚合器並寫入日誌
        let aggregator = Arc::clone(&self.aggregator);
        let id = bus.subscribe("error.occurred", move |event| {
            let error_type = event.data["error_type"].as_str().unwrap_or("unknown");
            let message = event.data["message"].as_str().unwrap_or("");
            aggregator.record(error_type, message, &event.source);
            error!(error_type, source = %event.source, "{}", message);
        });
        self.subscriptions.push(id);

        // 生命週期事件
        let id = bus.subscribe("app.startup", |event| {
            info!(components = %event.data["components"], "應用已啟動");
        });
        self.subscriptions.push(id);

        self.bus = Some(bus);
        true
    }

    fn update(&mut self, _delta_time: f64) {}

    fn shutdown(&mut self) {
        if let Some(bus) = self.bus.take() {
            for id in self.subscriptions.drain(..) {
                bus.unsubscribe(id);
            }
        }
    }
}
