// app/framework.rs - 應用生命週期宿主
//
// 鎖紀律：調用元件方法（initialize / update / shutdown）之前必須
// 先複製句柄並釋放註冊表鎖，元件因此可以在這些方法內
// 再次訪問註冊表（查詢、註冊其他元件）而不死鎖。
// 單一元件的恐慌被捕獲並記錄，不會拖垮宿主或其他元件。

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::app::component::{Component, SharedComponent};
use crate::app::perf::PerformanceMonitor;
use crate::app::{AppError, AppResult};
use crate::clock::SimulationClock;
use crate::config::ConfigManager;
use crate::event::EventBus;

/// 事件來源標籤
const SOURCE: &str = "Application";

/// 註冊表條目
struct ComponentEntry {
    name: String,
    component: SharedComponent,
}

/// 應用生命週期宿主
///
/// 持有核心服務（事件匯流排、模擬時鐘、配置管理器）與元件註冊表。
/// 啟動時按註冊順序初始化元件，主循環以固定時間步長驅動更新，
/// 關閉時按註冊的逆序釋放元件。
pub struct Application {
    event_bus: Arc<EventBus>,
    clock: Arc<SimulationClock>,
    config: Arc<ConfigManager>,
    components: Mutex<Vec<ComponentEntry>>,
    /// 移除時元件鎖被占用（元件正在自己的方法內）的條目，
    /// 延後到當前幀結束再關閉
    pending_teardown: Mutex<Vec<ComponentEntry>>,
    running: AtomicBool,
    shutdown_requested: AtomicBool,
    perf: Mutex<PerformanceMonitor>,
    /// 目標幀時間（秒），由 graphics.target_fps 決定
    target_frame_time: f64,
}

impl Application {
    /// 以給定的配置管理器創建應用
    pub fn new(config: Arc<ConfigManager>) -> Self {
        let event_bus = Arc::new(EventBus::new());
        let clock = Arc::new(SimulationClock::new(Arc::clone(&event_bus)));

        let target_fps: u32 = config.get_or("graphics.target_fps", 60);
        let target_frame_time = 1.0 / f64::from(target_fps.max(1));

        Self {
            event_bus,
            clock,
            config,
            components: Mutex::new(Vec::new()),
            pending_teardown: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            perf: Mutex::new(PerformanceMonitor::new()),
            target_frame_time,
        }
    }

    /// 事件匯流排
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// 模擬時鐘
    pub fn clock(&self) -> &Arc<SimulationClock> {
        &self.clock
    }

    /// 配置管理器
    pub fn config(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    /// 註冊元件
    ///
    /// 元件名稱必須唯一，重複註冊返回錯誤。
    /// 應用已在運行時，新註冊的元件會立即初始化；
    /// 初始化失敗的元件被移出註冊表，但註冊調用本身不視為錯誤。
    pub fn register_component(
        &self,
        name: &str,
        component: Box<dyn Component>,
    ) -> AppResult<()> {
        let shared: SharedComponent = Arc::new(Mutex::new(component));
        {
            let mut components = self.components.lock();
            if components.iter().any(|e| e.name == name) {
                return Err(AppError::DuplicateComponent(name.to_string()));
            }
            components.push(ComponentEntry {
                name: name.to_string(),
                component: Arc::clone(&shared),
            });
        }
        info!(component = name, "元件已註冊");

        if self.running.load(Ordering::SeqCst) && !self.initialize_component(name, &shared) {
            self.unregister_component(name);
        }
        Ok(())
    }

    /// 取消註冊元件並調用其 shutdown
    ///
    /// 找到並移除時返回 true，元件不存在時返回 false。
    /// 元件在自己的 `update` 中取消註冊自己也是允許的，
    /// 此時 shutdown 延後到當前幀結束再調用。
    pub fn unregister_component(&self, name: &str) -> bool {
        let entry = {
            let mut components = self.components.lock();
            match components.iter().position(|e| e.name == name) {
                Some(index) => components.remove(index),
                None => return false,
            }
        };

        self.teardown_entry(entry);
        info!(component = name, "元件已取消註冊");
        true
    }

    /// 按名稱查找元件
    pub fn get_component(&self, name: &str) -> Option<SharedComponent> {
        self.components
            .lock()
            .iter()
            .find(|e| e.name == name)
            .map(|e| Arc::clone(&e.component))
    }

    /// 當前已註冊的元件名稱（按註冊順序）
    pub fn component_names(&self) -> Vec<String> {
        self.components.lock().iter().map(|e| e.name.clone()).collect()
    }

    /// 啟動應用
    ///
    /// 先發佈 `"app.startup"` 事件（負載包含已註冊的元件名稱列表），
    /// 再按註冊順序初始化所有元件；初始化失敗（返回 false 或恐慌）的
    /// 元件被防禦性關閉並移出註冊表，其餘元件繼續。
    /// 返回 true 表示所有元件都初始化成功。
    pub fn startup(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            return true;
        }
        info!("應用啟動中");

        // 套用配置中的默認時間速度
        let speed: f64 = self.config.get_or("simulation.default_time_speed", 1.0);
        if let Err(e) = self.clock.set_speed(speed) {
            warn!("配置的默認時間速度無效，保持 1.0: {}", e);
        }

        self.event_bus.publish(
            "app.startup",
            json!({ "components": self.component_names() }),
            SOURCE,
        );

        let snapshot: Vec<(String, SharedComponent)> = {
            let components = self.components.lock();
            components
                .iter()
                .map(|e| (e.name.clone(), Arc::clone(&e.component)))
                .collect()
        };

        let mut all_ok = true;
        for (name, shared) in snapshot {
            if !self.initialize_component(&name, &shared) {
                // 失敗的元件防禦性關閉後移除，其餘元件繼續初始化
                self.unregister_component(&name);
                all_ok = false;
            }
        }

        info!("應用啟動完成");
        all_ok
    }

    /// 推進一幀：依註冊順序調用各元件的 update
    ///
    /// 更新中恐慌的元件被關閉並移出註冊表，本幀其餘元件照常更新。
    /// 元件在 `update` 中調用 `shutdown` 或取消註冊自己時，
    /// 其自身的關閉延後到本幀所有更新結束後補做。
    pub fn tick(&self, delta_time: f64) {
        let was_running = self.running.load(Ordering::SeqCst);
        let snapshot: Vec<(String, SharedComponent)> = {
            let components = self.components.lock();
            components
                .iter()
                .map(|e| (e.name.clone(), Arc::clone(&e.component)))
                .collect()
        };

        for (name, shared) in snapshot {
            // 幀內發生關閉後不再更新其餘元件
            if was_running && !self.running.load(Ordering::SeqCst) {
                break;
            }

            let result =
                catch_unwind(AssertUnwindSafe(|| shared.lock().update(delta_time)));
            if result.is_err() {
                error!(component = %name, "元件更新發生恐慌，已移出註冊表");
                self.unregister_component(&name);
            }
        }

        self.process_pending_teardown();
        self.perf.lock().record_frame();
    }

    /// 主循環
    ///
    /// 以固定時間步長驅動幀更新，直到 `request_shutdown` 被調用
    /// 或應用被外部關閉；退出前執行 `shutdown`。
    /// 應用尚未啟動時會先執行 `startup`。
    pub fn run(&self) {
        if !self.running.load(Ordering::SeqCst) {
            self.startup();
        }

        info!("主循環開始");
        let mut last_frame = Instant::now();
        while self.running.load(Ordering::SeqCst)
            && !self.shutdown_requested.load(Ordering::SeqCst)
        {
            let frame_start = Instant::now();
            let delta_time = frame_start.duration_since(last_frame).as_secs_f64();
            last_frame = frame_start;
            self.tick(delta_time);

            let elapsed = frame_start.elapsed().as_secs_f64();
            if elapsed < self.target_frame_time {
                std::thread::sleep(Duration::from_secs_f64(self.target_frame_time - elapsed));
            }
        }
        info!("主循環結束");

        self.shutdown();
    }

    /// 請求退出主循環（可由任意執行緒調用）
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    /// 關閉應用（冪等，重複調用為空操作）
    ///
    /// 發佈 `"app.shutdown"` 事件，按註冊的逆序關閉所有元件，
    /// 最後暫停模擬時鐘。元件在自己的 `update` 中調用本方法也是
    /// 允許的：該元件自身的關閉延後到當前幀結束，其餘元件立即關閉。
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("應用關閉中");

        self.event_bus
            .publish("app.shutdown", json!({"reason": "requested"}), SOURCE);

        let entries: Vec<ComponentEntry> = {
            let mut components = self.components.lock();
            components.drain(..).collect()
        };
        for entry in entries.into_iter().rev() {
            self.teardown_entry(entry);
        }

        self.clock.pause();
        info!("應用已關閉");
    }

    /// 應用是否在運行中
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 最近結算的 FPS
    pub fn fps(&self) -> f64 {
        self.perf.lock().fps()
    }

    /// 累計幀數
    pub fn frame_count(&self) -> u64 {
        self.perf.lock().total_frames()
    }

    /// 初始化單一元件；返回 false 表示失敗（含恐慌）
    fn initialize_component(&self, name: &str, shared: &SharedComponent) -> bool {
        let result = catch_unwind(AssertUnwindSafe(|| shared.lock().initialize(self)));
        match result {
            Ok(true) => true,
            Ok(false) => {
                warn!(component = name, "元件初始化失敗");
                false
            }
            Err(_) => {
                error!(component = name, "元件初始化發生恐慌");
                false
            }
        }
    }

    /// 關閉並丟棄一個已移出註冊表的元件
    ///
    /// 元件鎖被占用時表示元件正在自己的方法內（例如 `update` 中
    /// 調用 `shutdown`），此時不能同步取鎖，改為延後到幀結束。
    fn teardown_entry(&self, entry: ComponentEntry) {
        if let Some(mut guard) = entry.component.try_lock() {
            let result = catch_unwind(AssertUnwindSafe(|| guard.shutdown()));
            if result.is_err() {
                error!(component = %entry.name, "元件關閉發生恐慌");
            }
            return;
        }
        debug!(component = %entry.name, "元件鎖被占用，關閉延後至本幀結束");
        self.pending_teardown.lock().push(entry);
    }

    /// 補做被延後的元件關閉（每幀結束時調用，此時元件鎖已釋放）
    fn process_pending_teardown(&self) {
        let pending: Vec<ComponentEntry> = {
            let mut list = self.pending_teardown.lock();
            list.drain(..).collect()
        };
        for entry in pending {
            self.teardown_entry(entry);
        }
    }
}
