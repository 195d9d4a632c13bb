//! # Script 模块
//!
//! 脚本的构建与表示。
//!
//! ## 模块结构
//!
//! - [`instruction`]：指令与构建完成的 `Script`
//! - [`builder`]：`ScriptBuilder`，两阶段解析标签
//! - [`parser`]：文本前端，产出同样的指令序列

pub mod builder;
pub mod instruction;
pub mod parser;

pub use builder::ScriptBuilder;
pub use instruction::{ChoiceOption, Hook, Instruction, Predicate, Script};
pub use parser::{Parser, parse_script};
