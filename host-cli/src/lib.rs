//! # Host CLI
//!
//! 无界面宿主：读取文本脚本，以固定帧长驱动 `vn_engine::Director`，
//! 把事件流逐行输出为 JSON。用于脚本回归测试与输入轨迹重放。

pub mod config;
pub mod player;
pub mod save_store;

pub use config::{ConfigError, HostConfig};
pub use player::{InputSource, PlayOutcome, Player, StopReason};
pub use save_store::FileSaveStore;
