//! # VN Engine
//!
//! 叙事脚本执行引擎的核心库。
//!
//! ## 架构概述
//!
//! `vn-engine` 是纯逻辑核心，不做渲染、音频解码或文件 IO。
//! 脚本被构建成不可变的指令序列，由宿主每帧驱动：
//!
//! ```text
//! Host                              Director
//!   │                                  │
//!   │──── tick(dt_ms, InputEvent?) ───►│  AnimationScheduler::update
//!   │                                  │  ScriptRuntime::step
//!   │◄─── Vec<RuntimeEvent> ───────────│
//!   │                                  │
//! ```
//!
//! 所有"等待"都是数据（[`ExecutionStatus`]），相同脚本与相同的
//! (dt, input) 序列总是产生相同的状态与事件流。
//!
//! ## 使用示例
//!
//! ```ignore
//! use vn_engine::{Director, InputEvent, parse_script};
//!
//! let script = parse_script::<()>("main", text)?;
//! let mut director = Director::new(script, ());
//!
//! loop {
//!     for event in director.tick(16, input.take())? {
//!         host.handle(event);
//!     }
//!     if director.is_finished() {
//!         break;
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`script`]：指令、Builder 与文本前端
//! - [`runtime`]：指令指针状态机
//! - [`animation`]：补间调度器
//! - [`director`]：每帧驱动器
//! - [`save`] / [`history`]：存档与回看
//! - [`assets`] / [`diagnostic`]：运行前检查

pub mod animation;
pub mod assets;
pub mod config;
pub mod diagnostic;
pub mod director;
pub mod error;
pub mod event;
pub mod history;
pub mod input;
pub mod runtime;
pub mod save;
pub mod script;
pub mod state;

// 重导出核心类型
pub use animation::{AnimationRequest, AnimationScheduler, Easing, Tween};
pub use assets::{
    AssetLookup, AssetManifest, ResourceReference, ResourceType, collect_asset_references,
    find_missing_assets, validate_script_assets,
};
pub use config::{EngineConfig, Settings};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_assets, analyze_script};
pub use director::Director;
pub use error::{
    AssetError, BuildError, ParseError, RuntimeError, SaveError, VnError, VnResult,
};
pub use event::{ChoiceItem, Position, RuntimeEvent};
pub use history::{History, HistoryEvent};
pub use input::InputEvent;
pub use runtime::ScriptRuntime;
pub use save::{
    GameSnapshot, MemorySaveStore, SaveData, SaveMetadata, SaveStore, SaveVersion,
};
pub use script::{ChoiceOption, Instruction, Parser, Script, ScriptBuilder, parse_script};
pub use state::{ExecutionStatus, GameState, PendingChoice, UserData};
