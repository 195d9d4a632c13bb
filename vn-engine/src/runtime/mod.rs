//! # Runtime 模块
//!
//! 脚本执行引擎，负责指令执行和执行状态管理。
//!
//! ## 模块结构
//!
//! - [`engine`]：执行状态机 `ScriptRuntime`
//! - [`executor`]：单条指令到事件的转换

pub mod engine;
pub mod executor;

pub use engine::ScriptRuntime;
pub use executor::{ExecuteResult, Executor, SideEffect};
