// 應用框架整合測試

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::json;

use gnss_demo_core::app::{AppError, Application, Component};
use gnss_demo_core::config::ConfigManager;

/// 把生命週期調用記錄到共享日誌的測試元件
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    init_result: bool,
    panic_on_update: bool,
}

impl Recorder {
    fn new(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name,
            log,
            init_result: true,
            panic_on_update: false,
        }
    }

    fn failing_init(mut self) -> Self {
        self.init_result = false;
        self
    }

    fn panicking_update(mut self) -> Self {
        self.panic_on_update = true;
        self
    }
}

impl Component for Recorder {
    fn initialize(&mut self, _app: &Application) -> bool {
        self.log.lock().push(format!("init:{}", self.name));
        self.init_result
    }

    fn update(&mut self, _delta_time: f64) {
        if self.panic_on_update {
            panic!("update failure");
        }
        self.log.lock().push(format!("update:{}", self.name));
    }

    fn shutdown(&mut self) {
        self.log.lock().push(format!("shutdown:{}", self.name));
    }
}

fn make_app() -> Application {
    Application::new(Arc::new(ConfigManager::with_defaults()))
}

#[test]
fn test_duplicate_component_rejected() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = make_app();

    app.register_component("a", Box::new(Recorder::new("a", Arc::clone(&log))))
        .unwrap();
    let err = app
        .register_component("a", Box::new(Recorder::new("a", Arc::clone(&log))))
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateComponent(name) if name == "a"));
}

#[test]
fn test_startup_tolerates_failing_component() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = make_app();

    app.register_component("a", Box::new(Recorder::new("a", Arc::clone(&log))))
        .unwrap();
    app.register_component(
        "b",
        Box::new(Recorder::new("b", Arc::clone(&log)).failing_init()),
    )
    .unwrap();
    app.register_component("c", Box::new(Recorder::new("c", Arc::clone(&log))))
        .unwrap();

    // 失敗的元件被防禦性關閉並移除，其餘元件照常初始化
    assert!(!app.startup());
    assert!(app.get_component("a").is_some());
    assert!(app.get_component("b").is_none());
    assert!(app.get_component("c").is_some());
    assert_eq!(
        *log.lock(),
        vec!["init:a", "init:b", "shutdown:b", "init:c"]
    );

    // 啟動事件在初始化之前發佈，列出當時已註冊的全部元件
    let history = app.event_bus().get_history(Some("app.startup"), 1);
    assert_eq!(history[0].data["components"], json!(["a", "b", "c"]));
    app.shutdown();
}

#[test]
fn test_update_panic_unregisters_component() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = make_app();

    app.register_component(
        "bad",
        Box::new(Recorder::new("bad", Arc::clone(&log)).panicking_update()),
    )
    .unwrap();
    app.register_component("good", Box::new(Recorder::new("good", Arc::clone(&log))))
        .unwrap();
    app.startup();

    app.tick(0.016);

    // 恐慌的元件被移除且走完關閉流程，同一幀內其餘元件照常更新
    assert!(app.get_component("bad").is_none());
    assert!(app.get_component("good").is_some());
    assert!(log.lock().contains(&"shutdown:bad".to_string()));
    assert!(log.lock().contains(&"update:good".to_string()));

    // 下一幀不再觸碰被移除的元件
    let before = log.lock().len();
    app.tick(0.016);
    assert_eq!(log.lock().len(), before + 1);
    app.shutdown();
}

/// 在自己的 update 內請求整個應用關閉的測試元件
struct SelfStopping {
    app: Arc<Application>,
    log: Arc<Mutex<Vec<String>>>,
}

impl Component for SelfStopping {
    fn initialize(&mut self, _app: &Application) -> bool {
        true
    }

    fn update(&mut self, _delta_time: f64) {
        self.app.shutdown();
    }

    fn shutdown(&mut self) {
        self.log.lock().push("shutdown:self".to_string());
    }
}

#[test]
fn test_shutdown_from_update_does_not_deadlock() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = Arc::new(make_app());

    app.register_component(
        "self",
        Box::new(SelfStopping {
            app: Arc::clone(&app),
            log: Arc::clone(&log),
        }),
    )
    .unwrap();
    app.register_component("tail", Box::new(Recorder::new("tail", Arc::clone(&log))))
        .unwrap();
    app.startup();

    // tick 在獨立線程跑，卡死時測試在期限內失敗而不是掛起
    let done = Arc::new(AtomicBool::new(false));
    let tick_app = Arc::clone(&app);
    let tick_done = Arc::clone(&done);
    let handle = std::thread::spawn(move || {
        tick_app.tick(0.016);
        tick_done.store(true, Ordering::SeqCst);
    });

    let deadline = Instant::now() + Duration::from_secs(3);
    while !done.load(Ordering::SeqCst) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(done.load(Ordering::SeqCst), "tick 未在期限內返回");
    handle.join().unwrap();

    // 發起關閉的元件在幀尾被關閉，後續元件不再更新
    assert!(!app.is_running());
    assert!(log.lock().contains(&"shutdown:self".to_string()));
    assert!(log.lock().contains(&"shutdown:tail".to_string()));
    assert!(!log.lock().contains(&"update:tail".to_string()));
}

#[test]
fn test_component_can_unregister_itself_during_update() {
    /// 在自己的 update 內把自己移出註冊表的測試元件
    struct SelfRemover {
        app: Arc<Application>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Component for SelfRemover {
        fn initialize(&mut self, _app: &Application) -> bool {
            true
        }

        fn update(&mut self, _delta_time: f64) {
            self.app.unregister_component("remover");
        }

        fn shutdown(&mut self) {
            self.log.lock().push("shutdown:remover".to_string());
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let app = Arc::new(make_app());
    app.register_component(
        "remover",
        Box::new(SelfRemover {
            app: Arc::clone(&app),
            log: Arc::clone(&log),
        }),
    )
    .unwrap();
    app.startup();

    app.tick(0.016);

    // 自我移除的元件在同一幀末尾完成關閉
    assert!(app.get_component("remover").is_none());
    assert_eq!(*log.lock(), vec!["shutdown:remover"]);
    app.shutdown();
}

#[test]
fn test_shutdown_reverses_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = make_app();

    for name in ["a", "b", "c"] {
        app.register_component(name, Box::new(Recorder::new(name, Arc::clone(&log))))
            .unwrap();
    }
    app.startup();
    log.lock().clear();

    app.shutdown();
    assert_eq!(*log.lock(), vec!["shutdown:c", "shutdown:b", "shutdown:a"]);
    assert!(!app.is_running());
    assert!(!app.clock().is_playing());
}

#[test]
fn test_shutdown_is_idempotent() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = make_app();
    app.register_component("a", Box::new(Recorder::new("a", Arc::clone(&log))))
        .unwrap();
    app.startup();

    app.shutdown();
    app.shutdown();

    let shutdowns = log
        .lock()
        .iter()
        .filter(|entry| entry.starts_with("shutdown:"))
        .count();
    assert_eq!(shutdowns, 1);
    assert_eq!(
        app.event_bus().get_history(Some("app.shutdown"), 10).len(),
        1
    );
}

#[test]
fn test_registration_while_running_initializes_immediately() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = make_app();
    app.startup();

    app.register_component("late", Box::new(Recorder::new("late", Arc::clone(&log))))
        .unwrap();
    assert_eq!(*log.lock(), vec!["init:late"]);

    // 運行中初始化失敗的元件不留在註冊表
    app.register_component(
        "late_fail",
        Box::new(Recorder::new("late_fail", Arc::clone(&log)).failing_init()),
    )
    .unwrap();
    assert!(app.get_component("late_fail").is_none());
    app.shutdown();
}

#[test]
fn test_run_loop_exits_on_request() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = Arc::new(make_app());
    app.register_component("a", Box::new(Recorder::new("a", Arc::clone(&log))))
        .unwrap();

    let loop_app = Arc::clone(&app);
    let handle = std::thread::spawn(move || loop_app.run());

    std::thread::sleep(Duration::from_millis(150));
    app.request_shutdown();
    handle.join().unwrap();

    assert!(!app.is_running());
    assert!(app.frame_count() > 0);
    assert!(log.lock().iter().any(|entry| entry == "update:a"));
    assert!(log.lock().iter().any(|entry| entry == "shutdown:a"));
}

#[test]
fn test_component_can_query_registry_during_initialize() {
    struct Introspector;
    impl Component for Introspector {
        fn initialize(&mut self, app: &Application) -> bool {
            // 初始化中訪問註冊表不得死鎖
            app.get_component("introspector").is_some()
        }
        fn update(&mut self, _delta_time: f64) {}
        fn shutdown(&mut self) {}
    }

    let app = make_app();
    app.register_component("introspector", Box::new(Introspector))
        .unwrap();
    assert!(app.startup());
    assert!(app.get_component("introspector").is_some());
    app.shutdown();
}
