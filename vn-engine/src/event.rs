//! # Event 模块
//!
//! 定义引擎向 Host 发出的所有事件。
//! `RuntimeEvent` 是引擎与表现层之间的**唯一通信方式**。
//!
//! ## 设计原则
//!
//! - **声明式**：事件描述"发生了什么"，不描述"怎么呈现"
//! - **无资源所有权**：只携带标识符和数值
//! - **字段顺序稳定**：序列化格式即对外协议

use serde::{Deserialize, Serialize};

/// 立绘坐标
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 呈现给玩家的选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceItem {
    /// 选项标识
    pub id: String,
    /// 选项显示文本
    pub text: String,
}

/// 引擎向 Host 发出的事件
///
/// 每条被执行的指令恰好产生一个事件（`Label`/`Jump`/`JumpIf`/`Branch`
/// 这类纯控制流指令除外）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeEvent {
    /// 对话或旁白（`speaker` 为 None 表示旁白）
    Said {
        speaker: Option<String>,
        text: String,
    },

    /// 显示选择分支
    ChoicePrompt { options: Vec<ChoiceItem> },

    /// 请求玩家输入文本
    TextInputPrompt { prompt: String, var_name: String },

    /// 切换背景
    BackgroundShown { asset_id: String },

    /// 显示立绘
    FigureShown {
        asset_id: String,
        position: Position,
        layer: i32,
        opacity: f32,
    },

    /// 隐藏立绘
    FigureHidden { asset_id: String },

    /// 播放背景音乐
    MusicPlayed {
        asset_id: String,
        #[serde(rename = "loop")]
        looping: bool,
    },

    /// 停止背景音乐
    MusicStopped,

    /// 播放音效
    SfxPlayed { asset_id: String, blocking: bool },

    /// 阻塞音效播放完毕
    SfxStopped,

    /// 动画属性更新
    Animated {
        target_id: String,
        property: String,
        value: f32,
    },

    /// 开始计时等待
    WaitStarted { remaining_ms: u64 },

    /// 开始等待点击
    WaitForClickStarted,

    /// 脚本执行完毕
    ScriptEnded,

    /// 无可见效果的指令（RunCode、UnlockGallery、Animate 请求）
    Noop,
}

impl RuntimeEvent {
    /// 是否为 `Noop`
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }
}
