use serde::{Deserialize, Serialize};

use crate::config::validation::{self, ValidationError, Validator};

/// 應用程序配置結構
///
/// 所有區段與欄位均帶默認值，配置文件中缺失的部分會自動補齊。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub app: AppConfig,
    pub graphics: GraphicsConfig,
    pub simulation: SimulationConfig,
    pub plugins: PluginsConfig,
    pub logging: LoggingConfig,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            graphics: GraphicsConfig::default(),
            simulation: SimulationConfig::default(),
            plugins: PluginsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Validator for ApplicationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證各個部分的配置
        self.app.validate()?;
        self.graphics.validate()?;
        self.simulation.validate()?;
        self.plugins.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

/// 應用基本配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "GNSS Interactive Demo".to_string(),
            version: "0.1.0".to_string(),
            window_width: 1280,
            window_height: 720,
        }
    }
}

impl Validator for AppConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        validation::not_empty(&self.name, "app.name")?;
        validation::in_range(self.window_width, 320, 7680, "app.window_width")?;
        validation::in_range(self.window_height, 240, 4320, "app.window_height")?;

        Ok(())
    }
}

/// 圖形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub target_fps: u32,
    pub vsync: bool,
    pub anti_aliasing: u32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            vsync: true,
            anti_aliasing: 4,
        }
    }
}

impl Validator for GraphicsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        validation::in_range(self.target_fps, 1, 240, "graphics.target_fps")?;
        validation::one_of(
            &self.anti_aliasing,
            &[0, 2, 4, 8, 16],
            "graphics.anti_aliasing",
        )?;

        Ok(())
    }
}

/// 模擬配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub default_time_speed: f64,
    pub time_step_ms: f64,
    pub max_satellites: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_time_speed: 1.0,
            time_step_ms: 16.67,
            max_satellites: 100,
        }
    }
}

impl Validator for SimulationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        validation::in_range(
            self.default_time_speed,
            0.1,
            100.0,
            "simulation.default_time_speed",
        )?;
        validation::in_range(self.time_step_ms, 1.0, 1000.0, "simulation.time_step_ms")?;
        validation::in_range(self.max_satellites, 1, 1000, "simulation.max_satellites")?;

        Ok(())
    }
}

/// 插件熱重載配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub auto_reload: bool,
    pub watch_directories: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            auto_reload: true,
            watch_directories: vec!["src/plugins".to_string()],
        }
    }
}

impl Validator for PluginsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.auto_reload && self.watch_directories.is_empty() {
            return Err(ValidationError::InvalidValue(
                "啟用自動重載但未指定監視目錄".to_string(),
            ));
        }

        for dir in &self.watch_directories {
            validation::not_empty(dir, "plugins.watch_directories")?;
        }

        Ok(())
    }
}

/// 日誌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file_level: String,
    pub console_level: String,
    pub directory: String,
    pub max_file_size: String,
    pub backup_count: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_level: "INFO".to_string(),
            console_level: "INFO".to_string(),
            directory: "logs".to_string(),
            max_file_size: "10MB".to_string(),
            backup_count: 5,
        }
    }
}

impl Validator for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        validation::log_level(&self.file_level, "logging.file_level")?;
        validation::log_level(&self.console_level, "logging.console_level")?;
        validation::not_empty(&self.directory, "logging.directory")?;
        validation::in_range(self.backup_count, 0, 100, "logging.backup_count")?;

        Ok(())
    }
}
