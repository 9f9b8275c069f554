// 模擬時鐘模組
//
// 提供可暫停、可調速的虛擬時間源，並透過事件匯流排廣播時間變化。

pub mod simulation;

pub use simulation::{ClockError, SimulationClock, MAX_SPEED, MIN_SPEED};
