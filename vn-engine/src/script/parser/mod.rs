//! # Parser 模块
//!
//! 文本脚本前端：两阶段解析（手写，无 regex 依赖），产出与手写构建相同的 `Script`。
//!
//! ## 架构
//!
//! ```text
//! 原始文本 → [阶段1: 块识别] → Vec<Block> → [阶段2: 块解析] → ScriptBuilder → finalize()
//! ```
//!
//! ## 语法
//!
//! ```text
//! # 注释
//! label: start
//! scene: shrine_day
//! show: miko 0.5 0.8 1 1.0
//! say: Miko | Welcome.
//! choice:
//!   - pray / Pray at the shrine / pray
//! label: pray
//! wait: 500
//! jump: start
//! ```
//!
//! 文本前端不支持 `jump_if` / `branch` / `run_code`，它们需要宿主代码提供闭包。
//!
//! ## 模块结构
//!
//! - `helpers`: 辅助解析函数
//! - `phase1`: 块识别
//! - `phase2`: 块解析

mod helpers;
mod phase1;
mod phase2;


use tracing::debug;

use crate::error::VnResult;
use crate::script::builder::ScriptBuilder;
use crate::script::instruction::Script;

use phase1::recognize_blocks;
use phase2::Phase2Parser;

// 重新导出辅助函数供测试与工具使用
pub use helpers::{split_choice_entry, split_command, split_pipe};

/// 脚本解析器
pub struct Parser {
    /// 阶段2解析器
    phase2: Phase2Parser,
}

impl Parser {
    /// 创建新的解析器
    pub fn new() -> Self {
        Self {
            phase2: Phase2Parser::new(),
        }
    }

    /// 解析脚本文本
    ///
    /// # 参数
    ///
    /// - `script_id`: 脚本标识符
    /// - `text`: 脚本文本内容
    ///
    /// # 返回
    ///
    /// 构建完成的 `Script`；语法错误返回 `VnError::Parse`，
    /// 标签错误返回 `VnError::Build`
    pub fn parse<U>(&mut self, script_id: &str, text: &str) -> VnResult<Script<U>> {
        self.phase2.warnings.clear();

        // 阶段 1：块识别
        let blocks = recognize_blocks(text);

        // 阶段 2：块解析
        let mut builder = ScriptBuilder::new(script_id);
        for block in blocks {
            self.phase2.parse_block(block, &mut builder)?;
        }

        debug!(
            script = script_id,
            instructions = builder.len(),
            warnings = self.phase2.warnings.len(),
            "文本脚本解析完成"
        );

        Ok(builder.finalize()?)
    }

    /// 获取解析过程中的警告
    pub fn warnings(&self) -> &[String] {
        &self.phase2.warnings
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// 便捷函数：解析并丢弃警告
pub fn parse_script<U>(script_id: &str, text: &str) -> VnResult<Script<U>> {
    Parser::new().parse(script_id, text)
}
