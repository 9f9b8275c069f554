// clock/simulation.rs - 模擬時鐘
//
// 時鐘狀態（當前時間、播放旗標、速度倍率、步長）只能透過時鐘自身的
// 方法在內部鎖保護下變更。事件一律在釋放時鐘鎖之後才發佈，
// 因此訂閱者回調中讀取時鐘不會死鎖。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::event::EventBus;

/// 速度倍率下限
pub const MIN_SPEED: f64 = 0.1;
/// 速度倍率上限
pub const MAX_SPEED: f64 = 100.0;

/// 週期更新間隔（約 60 Hz）
const TICK_INTERVAL: StdDuration = StdDuration::from_millis(16);

/// 事件來源標籤
const SOURCE: &str = "SimulationClock";

/// 模擬時鐘錯誤類型
#[derive(Debug, Error)]
pub enum ClockError {
    /// 速度倍率超出有效範圍
    #[error("速度倍率 {value} 不在範圍 {min}..{max} 內")]
    InvalidSpeed { value: f64, min: f64, max: f64 },
}

/// 時鐘內部狀態（受互斥鎖保護）
struct ClockState {
    current_time: DateTime<Utc>,
    is_playing: bool,
    speed_multiplier: f64,
    step_size: Duration,
    /// 實際時間參考點，用於計算播放時的時間推進量
    last_update: Instant,
}

impl ClockState {
    /// 播放中則按實際經過時間乘上速度倍率推進虛擬時間。
    /// 返回 true 表示有推進（呼叫方在釋放鎖後發佈 time.changed）。
    fn advance_if_playing(&mut self) -> bool {
        if !self.is_playing {
            return false;
        }
        let now = Instant::now();
        let real_delta = now.duration_since(self.last_update);
        self.last_update = now;

        let scaled = real_delta.as_secs_f64() * self.speed_multiplier;
        let sim_delta = Duration::from_std(StdDuration::from_secs_f64(scaled))
            .unwrap_or_else(|_| Duration::zero());
        self.current_time += sim_delta;
        true
    }
}

/// 可暫停、可調速的模擬時鐘
///
/// 初始為停止狀態。播放期間由背景執行緒以約 60 Hz 的頻率推進時間
/// 並發佈 `"time.changed"` 事件（負載：`{time, speed, is_playing}`）。
pub struct SimulationClock {
    state: Arc<Mutex<ClockState>>,
    bus: Arc<EventBus>,
    real_start: Instant,
    ticker_stop: Arc<AtomicBool>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl SimulationClock {
    /// 創建新的模擬時鐘，虛擬時間從當前 UTC 時間開始
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self::with_start_time(bus, Utc::now())
    }

    /// 以指定的起始虛擬時間創建模擬時鐘
    pub fn with_start_time(bus: Arc<EventBus>, start_time: DateTime<Utc>) -> Self {
        let state = Arc::new(Mutex::new(ClockState {
            current_time: start_time,
            is_playing: false,
            speed_multiplier: 1.0,
            step_size: Duration::seconds(1),
            last_update: Instant::now(),
        }));

        let clock = Self {
            state,
            bus,
            real_start: Instant::now(),
            ticker_stop: Arc::new(AtomicBool::new(false)),
            ticker: Mutex::new(None),
        };
        clock.start_ticker();
        clock
    }

    /// 獲取當前虛擬時間
    ///
    /// 播放中會先推進到最新（與週期更新持相同鎖，讀取總是一致的）。
    pub fn current_time(&self) -> DateTime<Utc> {
        let (time, advanced) = {
            let mut state = self.state.lock();
            let advanced = state.advance_if_playing();
            (state.current_time, advanced)
        };
        if advanced {
            self.publish_time_changed();
        }
        time
    }

    /// 是否正在播放
    pub fn is_playing(&self) -> bool {
        self.state.lock().is_playing
    }

    /// 獲取當前速度倍率
    pub fn speed_multiplier(&self) -> f64 {
        self.state.lock().speed_multiplier
    }

    /// 獲取當前步長
    pub fn step_size(&self) -> Duration {
        self.state.lock().step_size
    }

    /// 開始播放（已在播放中則為冪等，不重複發佈事件）
    pub fn play(&self) {
        let transitioned = {
            let mut state = self.state.lock();
            if state.is_playing {
                false
            } else {
                state.is_playing = true;
                state.last_update = Instant::now();
                true
            }
        };
        if transitioned {
            self.publish_control_event("time.play");
        }
    }

    /// 暫停播放（已停止則為冪等）
    pub fn pause(&self) {
        let transitioned = {
            let mut state = self.state.lock();
            if state.is_playing {
                // 暫停前先結算最後一段經過時間
                state.advance_if_playing();
                state.is_playing = false;
                true
            } else {
                false
            }
        };
        if transitioned {
            self.publish_control_event("time.pause");
        }
    }

    /// 前進指定步數（不論播放狀態；steps 可為零或負數）
    pub fn step_forward(&self, steps: i32) {
        self.step(steps);
    }

    /// 後退指定步數（不論播放狀態；steps 可為零或負數）
    pub fn step_backward(&self, steps: i32) {
        // i32::MIN 取負會溢出，飽和到 i32::MAX
        self.step(steps.checked_neg().unwrap_or(i32::MAX));
    }

    fn step(&self, steps: i32) {
        {
            let mut state = self.state.lock();
            let delta = state.step_size * steps;
            state.current_time += delta;
        }
        self.publish_control_event("time.step");
        self.publish_time_changed();
    }

    /// 設置速度倍率
    ///
    /// 超出 `[MIN_SPEED, MAX_SPEED]` 時返回錯誤且不改變任何狀態。
    /// 成功時重置實際時間參考點，新速度只作用於之後的經過時間。
    pub fn set_speed(&self, multiplier: f64) -> Result<(), ClockError> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&multiplier) {
            return Err(ClockError::InvalidSpeed {
                value: multiplier,
                min: MIN_SPEED,
                max: MAX_SPEED,
            });
        }

        {
            let mut state = self.state.lock();
            // 先以舊速度結算到當前，再切換倍率
            state.advance_if_playing();
            state.speed_multiplier = multiplier;
            state.last_update = Instant::now();
        }
        self.publish_control_event("time.speed_changed");
        Ok(())
    }

    /// 跳轉到指定虛擬時間
    pub fn set_time(&self, new_time: DateTime<Utc>) {
        {
            let mut state = self.state.lock();
            state.current_time = new_time;
            state.last_update = Instant::now();
        }
        self.publish_control_event("time.jump");
        self.publish_time_changed();
    }

    /// 設置手動步進的步長
    pub fn set_step_size(&self, step_size: Duration) {
        self.state.lock().step_size = step_size;
    }

    /// 獲取時鐘創建以來經過的實際時間（秒）
    pub fn elapsed_real_time(&self) -> f64 {
        self.real_start.elapsed().as_secs_f64()
    }

    /// 發佈 time.changed 事件（負載：time / speed / is_playing）
    fn publish_time_changed(&self) {
        let (time, speed, is_playing) = {
            let state = self.state.lock();
            (
                state.current_time,
                state.speed_multiplier,
                state.is_playing,
            )
        };
        self.bus.publish(
            "time.changed",
            json!({
                "time": time.to_rfc3339(),
                "speed": speed,
                "is_playing": is_playing,
            }),
            SOURCE,
        );
    }

    /// 發佈時間控制事件（time.play / time.pause / time.step / ...）
    fn publish_control_event(&self, event_type: &str) {
        let (time, speed) = {
            let state = self.state.lock();
            (state.current_time, state.speed_multiplier)
        };
        self.bus.publish(
            event_type,
            json!({
                "time": time.to_rfc3339(),
                "speed": speed,
            }),
            SOURCE,
        );
    }

    /// 啟動週期更新執行緒
    fn start_ticker(&self) {
        let state = Arc::clone(&self.state);
        let bus = Arc::clone(&self.bus);
        let stop = Arc::clone(&self.ticker_stop);

        let spawned = std::thread::Builder::new()
            .name("simulation-clock".to_string())
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(TICK_INTERVAL);
                    let advanced = {
                        let mut locked = state.lock();
                        locked.advance_if_playing()
                    };
                    if advanced {
                        let (time, speed, is_playing) = {
                            let locked = state.lock();
                            (
                                locked.current_time,
                                locked.speed_multiplier,
                                locked.is_playing,
                            )
                        };
                        bus.publish(
                            "time.changed",
                            json!({
                                "time": time.to_rfc3339(),
                                "speed": speed,
                                "is_playing": is_playing,
                            }),
                            SOURCE,
                        );
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                *self.ticker.lock() = Some(handle);
            }
            Err(e) => {
                // 無週期執行緒時，時間仍會在每次讀取時推進
                error!("無法啟動時鐘更新執行緒: {}", e);
            }
        }
    }
}

impl Drop for SimulationClock {
    fn drop(&mut self) {
        self.ticker_stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.ticker.lock().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    fn make_clock() -> (Arc<EventBus>, SimulationClock) {
        let bus = Arc::new(EventBus::new());
        let start = Utc.with_ymd_and_hms(2025, 9, 15, 0, 0, 0).unwrap();
        let clock = SimulationClock::with_start_time(Arc::clone(&bus), start);
        (bus, clock)
    }

    #[test]
    fn test_initial_state() {
        let (_bus, clock) = make_clock();
        assert!(!clock.is_playing());
        assert_eq!(clock.speed_multiplier(), 1.0);
        assert_eq!(clock.step_size(), Duration::seconds(1));
    }

    #[test]
    fn test_step_changes_time_by_step_size() {
        let (_bus, clock) = make_clock();
        let before = clock.current_time();

        clock.step_forward(5);
        assert_eq!(clock.current_time(), before + Duration::seconds(5));

        clock.step_backward(2);
        assert_eq!(clock.current_time(), before + Duration::seconds(3));
    }

    #[test]
    fn test_step_zero_still_publishes() {
        let (bus, clock) = make_clock();
        bus.clear_history();

        clock.step_forward(0);

        let history = bus.get_history(None, 10);
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["time.step", "time.changed"]);
    }

    #[test]
    fn test_set_speed_rejects_out_of_range() {
        let (_bus, clock) = make_clock();

        let err = clock.set_speed(0.05).unwrap_err();
        assert_matches!(err, ClockError::InvalidSpeed { .. });
        assert_eq!(clock.speed_multiplier(), 1.0);

        assert!(clock.set_speed(100.1).is_err());
        assert_eq!(clock.speed_multiplier(), 1.0);
    }

    #[test]
    fn test_set_speed_accepts_bounds() {
        let (_bus, clock) = make_clock();
        assert!(clock.set_speed(MIN_SPEED).is_ok());
        assert!(clock.set_speed(MAX_SPEED).is_ok());
        assert_eq!(clock.speed_multiplier(), MAX_SPEED);
    }

    #[test]
    fn test_set_time_jumps() {
        let (bus, clock) = make_clock();
        let target = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        bus.clear_history();

        clock.set_time(target);

        assert_eq!(clock.current_time(), target);
        let history = bus.get_history(None, 10);
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["time.jump", "time.changed"]);
    }

    #[test]
    fn test_play_pause_idempotent() {
        let (bus, clock) = make_clock();
        bus.clear_history();

        clock.play();
        clock.play();
        clock.pause();
        clock.pause();

        let history = bus.get_history(None, 100);
        let control: Vec<&str> = history
            .iter()
            .map(|e| e.event_type.as_str())
            .filter(|t| *t == "time.play" || *t == "time.pause")
            .collect();
        assert_eq!(control, vec!["time.play", "time.pause"]);
    }

    #[test]
    fn test_paused_clock_does_not_advance() {
        let (_bus, clock) = make_clock();
        let before = clock.current_time();
        std::thread::sleep(StdDuration::from_millis(60));
        assert_eq!(clock.current_time(), before);
    }

    #[test]
    fn test_playing_clock_advances() {
        let (_bus, clock) = make_clock();
        let before = clock.current_time();
        clock.play();
        std::thread::sleep(StdDuration::from_millis(80));
        clock.pause();
        assert!(clock.current_time() > before);
    }

    #[test]
    fn test_step_backward_extreme_count_does_not_panic() {
        let (_bus, clock) = make_clock();
        let before = clock.current_time();

        // 負的後退步數等同前進；邊界值 i32::MIN 飽和而不溢出
        clock.step_backward(i32::MIN);
        assert!(clock.current_time() > before);

        clock.step_backward(-3);
        clock.step_forward(-3);
        assert_eq!(
            clock.current_time(),
            before + Duration::seconds(i64::from(i32::MAX))
        );
    }

    #[test]
    fn test_custom_step_size() {
        let (_bus, clock) = make_clock();
        clock.set_step_size(Duration::milliseconds(500));
        let before = clock.current_time();
        clock.step_forward(2);
        assert_eq!(clock.current_time(), before + Duration::seconds(1));
    }
}
