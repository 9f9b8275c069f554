use std::fs;
use std::path::Path;

use config::{Config, Environment as ConfigEnvironment, File, FileFormat};
use serde_json::Value;
use tracing::warn;

use crate::config::types::ApplicationConfig;
use crate::config::validation::Validator;
use crate::config::ConfigResult;

/// 環境變數前綴（例如 GNSS__GRAPHICS__TARGET_FPS=120）
const ENV_PREFIX: &str = "GNSS";

/// 配置加載器
///
/// 加載順序：內建默認值 → JSON 配置文件 → 環境變數覆蓋。
/// 每一層合併後都會做整樹驗證，無效的層被捨棄並回退到上一層。
pub struct ConfigLoader;

impl ConfigLoader {
    /// 內建默認配置樹
    pub fn defaults() -> Value {
        // 默認值由類型定義給出，序列化不會失敗
        serde_json::to_value(ApplicationConfig::default()).unwrap_or(Value::Null)
    }

    /// 載入配置文件並疊加環境變數
    ///
    /// 文件不存在時先寫出默認配置；文件無法解析或驗證失敗時
    /// 以默認配置覆寫文件並從默認值繼續。
    pub fn load(path: &Path) -> ConfigResult<Value> {
        if !path.exists() {
            Self::write_defaults(path)?;
        }

        // 文件層：解析失敗或驗證失敗都回退到默認值
        let file_tree = match Self::read_and_validate(path) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(path = %path.display(), "配置文件無效，以默認配置覆寫: {}", e);
                Self::write_defaults(path)?;
                Self::defaults()
            }
        };

        // 環境變數層
        let merged = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json))
            .add_source(
                ConfigEnvironment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Value>()?;

        // 驗證合併結果；環境變數引入無效值時跳過整個環境層
        match Self::validate_tree(&merged) {
            Ok(()) => Ok(merged),
            Err(e) => {
                warn!("環境變數覆蓋驗證失敗，已忽略環境層: {}", e);
                Ok(file_tree)
            }
        }
    }

    /// 讀取並驗證配置文件
    fn read_and_validate(path: &Path) -> ConfigResult<Value> {
        let content = fs::read_to_string(path)?;
        let tree: Value = serde_json::from_str(&content)?;
        Self::validate_tree(&tree)?;
        Ok(tree)
    }

    /// 將配置樹反序列化為類型化結構並驗證
    pub fn validate_tree(tree: &Value) -> ConfigResult<()> {
        let typed: ApplicationConfig = serde_json::from_value(tree.clone())?;
        typed.validate()?;
        Ok(())
    }

    /// 寫出默認配置文件（必要時創建父目錄）
    pub fn write_defaults(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&Self::defaults())?;
        fs::write(path, content)?;
        Ok(())
    }
}
