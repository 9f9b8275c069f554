// app/perf.rs - 幀率統計

use std::time::Instant;

/// 幀性能監視器
///
/// FPS 每秒結算一次，避免逐幀計算造成數值抖動。
#[derive(Debug)]
pub struct PerformanceMonitor {
    total_frames: u64,
    frames_since_mark: u32,
    mark: Instant,
    fps: f64,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            frames_since_mark: 0,
            mark: Instant::now(),
            fps: 0.0,
        }
    }

    /// 記錄一幀；滿一秒時結算 FPS
    pub fn record_frame(&mut self) {
        self.total_frames += 1;
        self.frames_since_mark += 1;

        let elapsed = self.mark.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.fps = self.frames_since_mark as f64 / elapsed;
            self.frames_since_mark = 0;
            self.mark = Instant::now();
        }
    }

    /// 最近一次結算的 FPS
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// 累計幀數
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// 重置所有統計
    pub fn reset(&mut self) {
        self.total_frames = 0;
        self.frames_since_mark = 0;
        self.mark = Instant::now();
        self.fps = 0.0;
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
