// app/component.rs - 元件生命週期接口

use std::sync::Arc;

use parking_lot::Mutex;

use crate::app::framework::Application;

/// 共享元件句柄
///
/// 註冊表在調用元件方法前先取出句柄並釋放註冊表鎖，
/// 因此元件在回調中可以再訪問註冊表。
pub type SharedComponent = Arc<Mutex<Box<dyn Component>>>;

/// 應用元件生命週期接口
///
/// 元件由應用統一管理：啟動時依註冊順序初始化，
/// 每幀依序調用 `update`，關閉時按註冊的逆序調用 `shutdown`。
pub trait Component: Send {
    /// 初始化元件
    ///
    /// 返回 false 表示初始化失敗；失敗的元件會被移出註冊表，
    /// 不影響其他元件的初始化。
    fn initialize(&mut self, app: &Application) -> bool;

    /// 每幀更新，`delta_time` 為距上一幀的時間（秒）
    fn update(&mut self, delta_time: f64);

    /// 關閉元件並釋放資源
    fn shutdown(&mut self);
}
