// monitor/perf.rs - 操作耗時統計

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::warn;

/// 每個操作保留的最近樣本數
const MAX_SAMPLES: usize = 100;

/// 超過此耗時（秒）的操作會記錄警告
const SLOW_THRESHOLD_SECS: f64 = 0.1;

/// 單一操作的耗時統計
#[derive(Debug, Clone)]
pub struct OperationStats {
    /// 累計調用次數
    pub count: u64,
    /// 最近樣本的平均耗時（秒）
    pub avg_secs: f64,
    /// 歷史最小耗時（秒）
    pub min_secs: f64,
    /// 歷史最大耗時（秒）
    pub max_secs: f64,
    /// 最近一次耗時（秒）
    pub recent_secs: f64,
}

struct OperationRecord {
    count: u64,
    min_secs: f64,
    max_secs: f64,
    samples: VecDeque<f64>,
}

/// 操作耗時追蹤器
///
/// 按操作名稱聚合耗時樣本；平均值只計算最近的樣本窗口，
/// 最小/最大值涵蓋全部歷史。
pub struct PerformanceTracker {
    records: Mutex<HashMap<String, OperationRecord>>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// 記錄一次操作耗時
    pub fn record(&self, operation: &str, secs: f64) {
        if secs > SLOW_THRESHOLD_SECS {
            warn!(operation, secs, "操作耗時超過慢操作閾值");
        }

        let mut records = self.records.lock();
        let record = records
            .entry(operation.to_string())
            .or_insert_with(|| OperationRecord {
                count: 0,
                min_secs: f64::INFINITY,
                max_secs: 0.0,
                samples: VecDeque::new(),
            });

        record.count += 1;
        record.min_secs = record.min_secs.min(secs);
        record.max_secs = record.max_secs.max(secs);
        record.samples.push_back(secs);
        while record.samples.len() > MAX_SAMPLES {
            record.samples.pop_front();
        }
    }

    /// 對閉包計時並記錄
    pub fn time<T>(&self, operation: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = f();
        self.record(operation, started.elapsed().as_secs_f64());
        result
    }

    /// 獲取指定操作的統計資訊
    pub fn stats(&self, operation: &str) -> Option<OperationStats> {
        let records = self.records.lock();
        records.get(operation).map(stats_of)
    }

    /// 獲取所有操作的統計資訊
    pub fn all_stats(&self) -> HashMap<String, OperationStats> {
        let records = self.records.lock();
        records
            .iter()
            .map(|(name, record)| (name.clone(), stats_of(record)))
            .collect()
    }

    /// 清空全部統計
    pub fn reset(&self) {
        self.records.lock().clear();
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn stats_of(record: &OperationRecord) -> OperationStats {
    let avg_secs = if record.samples.is_empty() {
        0.0
    } else {
        record.samples.iter().sum::<f64>() / record.samples.len() as f64
    };
    OperationStats {
        count: record.count,
        avg_secs,
        min_secs: record.min_secs,
        max_secs: record.max_secs,
        recent_secs: record.samples.back().copied().unwrap_or(0.0),
    }
}
