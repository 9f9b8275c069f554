// config/validation.rs - 配置驗證
//
// 各配置區段實現 Validator，整樹驗證即逐區段驗證。
// 本模組提供區段驗證共用的檢查函數。

use thiserror::Error;

/// 配置驗證錯誤
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("缺少必要配置項: {0}")]
    MissingField(String),

    #[error("無效的配置值: {0}")]
    InvalidValue(String),

    #[error("配置範圍錯誤: {field} 的值 {value} 不在範圍 {min}..{max} 內")]
    RangeError {
        field: String,
        value: String,
        min: String,
        max: String,
    },
}

/// 配置驗證器trait
pub trait Validator {
    /// 驗證配置
    fn validate(&self) -> Result<(), ValidationError>;
}

/// 驗證數值落在閉區間內
pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
where
    T: PartialOrd + ToString,
{
    if value < min || value > max {
        return Err(ValidationError::RangeError {
            field: field.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

/// 驗證值是給定選項之一
pub fn one_of<T>(value: &T, options: &[T], field: &str) -> Result<(), ValidationError>
where
    T: PartialEq + ToString,
{
    if !options.contains(value) {
        return Err(ValidationError::InvalidValue(format!(
            "{} 的值 {} 不是有效選項: {:?}",
            field,
            value.to_string(),
            options.iter().map(ToString::to_string).collect::<Vec<_>>()
        )));
    }
    Ok(())
}

/// 驗證字串欄位有非空白內容
pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    Ok(())
}

/// 驗證日誌級別名稱（不區分大小寫）
pub fn log_level(value: &str, field: &str) -> Result<(), ValidationError> {
    const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    if LEVELS.contains(&value.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue(format!(
            "{} 的值 {} 不是有效的日誌級別: {:?}",
            field, value, LEVELS
        )))
    }
}
