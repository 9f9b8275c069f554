// monitor/errors.rs - 錯誤聚合

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// 每種錯誤類型保留的最近明細數
const MAX_DETAILS: usize = 50;

/// 單筆錯誤明細
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// 單一錯誤類型的聚合摘要
#[derive(Debug, Clone)]
pub struct ErrorSummary {
    pub error_type: String,
    /// 累計發生次數（不受明細上限影響）
    pub count: u64,
    pub last_message: String,
    pub last_at: DateTime<Utc>,
}

struct ErrorRecord {
    count: u64,
    details: Vec<ErrorDetail>,
}

/// 錯誤聚合器
///
/// 按錯誤類型累計發生次數，並保留每種類型最近的明細。
pub struct ErrorAggregator {
    records: Mutex<HashMap<String, ErrorRecord>>,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// 記錄一筆錯誤
    pub fn record(&self, error_type: &str, message: &str, source: &str) {
        let mut records = self.records.lock();
        let record = records
            .entry(error_type.to_string())
            .or_insert_with(|| ErrorRecord {
                count: 0,
                details: Vec::new(),
            });

        record.count += 1;
        record.details.push(ErrorDetail {
            message: message.to_string(),
            source: source.to_string(),
            timestamp: Utc::now(),
        });
        if record.details.len() > MAX_DETAILS {
            record.details.remove(0);
        }
    }

    /// 指定錯誤類型的累計次數
    pub fn count(&self, error_type: &str) -> u64 {
        self.records
            .lock()
            .get(error_type)
            .map_or(0, |r| r.count)
    }

    /// 指定錯誤類型的最近明細
    pub fn details(&self, error_type: &str) -> Vec<ErrorDetail> {
        self.records
            .lock()
            .get(error_type)
            .map(|r| r.details.clone())
            .unwrap_or_default()
    }

    /// 所有錯誤類型的摘要
    pub fn summary(&self) -> Vec<ErrorSummary> {
        let records = self.records.lock();
        records
            .iter()
            .filter_map(|(error_type, record)| {
                record.details.last().map(|last| ErrorSummary {
                    error_type: error_type.clone(),
                    count: record.count,
                    last_message: last.message.clone(),
                    last_at: last.timestamp,
                })
            })
            .collect()
    }

    /// 清空全部記錄
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Default for ErrorAggregator {
    fn default() -> Self {
        Self::new()
    }
}
