// 模組定義
pub mod app;
pub mod clock;
pub mod config;
pub mod event;
pub mod monitor;
pub mod reload;
