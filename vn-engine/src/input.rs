//! # Input 模块
//!
//! 定义 Host 向引擎传递的输入事件。
//!
//! ## 设计说明
//!
//! - `InputEvent` 是 Host 采集用户操作后传递给引擎的语义化输入
//! - 引擎不直接处理鼠标/键盘事件
//! - 时间流逝通过 `tick(dt_ms, ..)` 的 `dt_ms` 参数传入，不是输入事件

use serde::{Deserialize, Serialize};

/// Host 向引擎传递的输入
///
/// - `Click`：解除 `WaitingClick`，其余等待状态下被忽略
/// - `ChoiceSelected`：解除 `WaitingChoice`
/// - `TextSubmitted`：解除 `WaitingTextInput`，文本写入目标变量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    /// 用户点击
    Click,

    /// 用户选择了某个选项（索引从 0 开始）
    ChoiceSelected { index: usize },

    /// 用户提交了文本
    TextSubmitted { text: String },
}

impl InputEvent {
    /// 创建点击输入
    pub fn click() -> Self {
        Self::Click
    }

    /// 创建选择输入
    pub fn choice(index: usize) -> Self {
        Self::ChoiceSelected { index }
    }

    /// 创建文本提交输入
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextSubmitted { text: text.into() }
    }
}
