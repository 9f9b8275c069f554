// 配置管理整合測試

use serde_json::json;
use serial_test::serial;

use gnss_demo_core::config::ConfigManager;

#[test]
fn test_missing_file_creates_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config").join("app_config.json");

    let manager = ConfigManager::new(&path).unwrap();
    assert!(path.exists());
    assert_eq!(manager.get::<u32>("graphics.target_fps"), Some(60));
    assert_eq!(
        manager.get::<String>("logging.console_level"),
        Some("INFO".to_string())
    );
}

#[test]
fn test_file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_config.json");
    std::fs::write(
        &path,
        r#"{"graphics": {"target_fps": 30}, "simulation": {"max_satellites": 12}}"#,
    )
    .unwrap();

    let manager = ConfigManager::new(&path).unwrap();
    assert_eq!(manager.get::<u32>("graphics.target_fps"), Some(30));
    assert_eq!(manager.get::<u32>("simulation.max_satellites"), Some(12));
    // 文件未提供的欄位回落到默認值
    assert_eq!(manager.get::<bool>("graphics.vsync"), Some(true));
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_config.json");
    std::fs::write(&path, r#"{"graphics": {"target_fps": 0}}"#).unwrap();

    // 驗證失敗的文件被默認配置覆寫
    let manager = ConfigManager::new(&path).unwrap();
    assert_eq!(manager.get::<u32>("graphics.target_fps"), Some(60));
}

#[test]
fn test_set_validates_before_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_config.json");
    let manager = ConfigManager::new(&path).unwrap();

    manager.set("graphics.target_fps", json!(120)).unwrap();
    assert_eq!(manager.get::<u32>("graphics.target_fps"), Some(120));

    // 無效值被拒絕，當前配置不變
    assert!(manager.set("graphics.target_fps", json!(0)).is_err());
    assert_eq!(manager.get::<u32>("graphics.target_fps"), Some(120));
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_config.json");

    {
        let manager = ConfigManager::new(&path).unwrap();
        manager
            .set("simulation.default_time_speed", json!(2.5))
            .unwrap();
        manager.save().unwrap();
    }

    let reloaded = ConfigManager::new(&path).unwrap();
    assert_eq!(
        reloaded.get::<f64>("simulation.default_time_speed"),
        Some(2.5)
    );
}

#[test]
#[serial]
fn test_env_override_applies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_config.json");

    std::env::set_var("GNSS__GRAPHICS__TARGET_FPS", "120");
    let manager = ConfigManager::new(&path).unwrap();
    std::env::remove_var("GNSS__GRAPHICS__TARGET_FPS");

    assert_eq!(manager.get::<u32>("graphics.target_fps"), Some(120));
}

#[test]
#[serial]
fn test_invalid_env_override_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_config.json");

    // 超出範圍的環境覆蓋被整層忽略，回退到文件層
    std::env::set_var("GNSS__GRAPHICS__TARGET_FPS", "0");
    let manager = ConfigManager::new(&path).unwrap();
    std::env::remove_var("GNSS__GRAPHICS__TARGET_FPS");

    assert_eq!(manager.get::<u32>("graphics.target_fps"), Some(60));
}

#[test]
fn test_typed_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app_config.json");
    let manager = ConfigManager::new(&path).unwrap();

    let typed = manager.typed().unwrap();
    assert_eq!(typed.app.name, "GNSS Interactive Demo");
    assert_eq!(typed.plugins.watch_directories, vec!["src/plugins"]);
}
