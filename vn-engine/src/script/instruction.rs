//! # Instruction 模块
//!
//! 定义脚本指令（Instruction）以及构建完成的脚本（Script）。
//!
//! ## 设计说明
//!
//! 指令序列由 [`ScriptBuilder`](super::ScriptBuilder) 或文本前端产生，
//! `finalize()` 之后得到不可变的 [`Script`]：标签索引与跳转表都已预先计算，
//! 执行期间不会再出现未解析的跳转。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::animation::Easing;
use crate::event::Position;
use crate::state::GameState;

/// 条件谓词（`JumpIf` / `Branch`）
pub type Predicate<U> = Arc<dyn Fn(&GameState<U>) -> bool + Send + Sync>;

/// 代码钩子（`RunCode`），同步执行，独占访问游戏状态
pub type Hook<U> = Arc<dyn Fn(&mut GameState<U>) + Send + Sync>;

/// 选择项（指令级别）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    /// 选项显示文本
    pub label_text: String,
    /// 选项标识
    pub id: String,
    /// 跳转目标标签
    pub target_label: String,
}

impl ChoiceOption {
    pub fn new(
        id: impl Into<String>,
        label_text: impl Into<String>,
        target_label: impl Into<String>,
    ) -> Self {
        Self {
            label_text: label_text.into(),
            id: id.into(),
            target_label: target_label.into(),
        }
    }
}

/// 脚本指令
pub enum Instruction<U> {
    /// 切换背景
    ShowBackground { id: String },

    /// 显示立绘
    ShowFigure {
        id: String,
        position: Position,
        layer: i32,
        opacity: f32,
    },

    /// 隐藏立绘
    HideFigure { id: String },

    /// 播放背景音乐
    PlayMusic { track: String, looping: bool },

    /// 停止背景音乐
    StopMusic,

    /// 播放音效（`blocking` 为 true 时可阻塞脚本直到播放完毕）
    PlaySfx { track: String, blocking: bool },

    /// 角色对话
    Say { speaker: String, text: String },

    /// 旁白
    Narrate { text: String },

    /// 选择分支
    Choice { options: Vec<ChoiceOption> },

    /// 文本输入，结果写入 `text_vars[var_name]`
    TextInput { prompt: String, var_name: String },

    /// 标签定义（无副作用的跳转目标）
    Label { name: String },

    /// 无条件跳转
    Jump { target_label: String },

    /// 条件跳转，谓词为假时继续执行下一条
    JumpIf {
        target_label: String,
        predicate: Predicate<U>,
    },

    /// 双路分支
    Branch {
        then_label: String,
        else_label: String,
        predicate: Predicate<U>,
    },

    /// 计时等待
    Wait { ms: u64 },

    /// 等待点击
    WaitClick,

    /// 属性动画（转交给动画调度器，不阻塞脚本）
    Animate {
        target_id: String,
        property: String,
        from: Option<f32>,
        to: f32,
        duration_ms: u64,
        easing: Easing,
    },

    /// 执行游戏代码
    RunCode { id: String, hook: Hook<U> },

    /// 解锁 CG 鉴赏
    UnlockGallery { id: String },
}

impl<U> Instruction<U> {
    /// 指令名称（用于日志与诊断）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShowBackground { .. } => "ShowBackground",
            Self::ShowFigure { .. } => "ShowFigure",
            Self::HideFigure { .. } => "HideFigure",
            Self::PlayMusic { .. } => "PlayMusic",
            Self::StopMusic => "StopMusic",
            Self::PlaySfx { .. } => "PlaySfx",
            Self::Say { .. } => "Say",
            Self::Narrate { .. } => "Narrate",
            Self::Choice { .. } => "Choice",
            Self::TextInput { .. } => "TextInput",
            Self::Label { .. } => "Label",
            Self::Jump { .. } => "Jump",
            Self::JumpIf { .. } => "JumpIf",
            Self::Branch { .. } => "Branch",
            Self::Wait { .. } => "Wait",
            Self::WaitClick => "WaitClick",
            Self::Animate { .. } => "Animate",
            Self::RunCode { .. } => "RunCode",
            Self::UnlockGallery { .. } => "UnlockGallery",
        }
    }

    /// 如果是标签指令，返回标签名
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label { name } => Some(name),
            _ => None,
        }
    }

    /// 该指令引用的所有跳转目标（按出现顺序）
    pub fn jump_targets(&self) -> Vec<&str> {
        match self {
            Self::Jump { target_label } | Self::JumpIf { target_label, .. } => {
                vec![target_label.as_str()]
            }
            Self::Branch {
                then_label,
                else_label,
                ..
            } => vec![then_label.as_str(), else_label.as_str()],
            Self::Choice { options } => options.iter().map(|o| o.target_label.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// 是否一定会让脚本进入等待
    ///
    /// `PlaySfx` 是否阻塞取决于引擎配置，这里不计入；`Wait(0)` 不会挂起。
    pub fn causes_wait(&self) -> bool {
        match self {
            Self::Wait { ms } => *ms > 0,
            Self::WaitClick | Self::Choice { .. } | Self::TextInput { .. } => true,
            _ => false,
        }
    }
}

impl<U> fmt::Debug for Instruction<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShowBackground { id } => f.debug_struct("ShowBackground").field("id", id).finish(),
            Self::ShowFigure {
                id,
                position,
                layer,
                opacity,
            } => f
                .debug_struct("ShowFigure")
                .field("id", id)
                .field("position", position)
                .field("layer", layer)
                .field("opacity", opacity)
                .finish(),
            Self::HideFigure { id } => f.debug_struct("HideFigure").field("id", id).finish(),
            Self::PlayMusic { track, looping } => f
                .debug_struct("PlayMusic")
                .field("track", track)
                .field("looping", looping)
                .finish(),
            Self::StopMusic => f.write_str("StopMusic"),
            Self::PlaySfx { track, blocking } => f
                .debug_struct("PlaySfx")
                .field("track", track)
                .field("blocking", blocking)
                .finish(),
            Self::Say { speaker, text } => f
                .debug_struct("Say")
                .field("speaker", speaker)
                .field("text", text)
                .finish(),
            Self::Narrate { text } => f.debug_struct("Narrate").field("text", text).finish(),
            Self::Choice { options } => f.debug_struct("Choice").field("options", options).finish(),
            Self::TextInput { prompt, var_name } => f
                .debug_struct("TextInput")
                .field("prompt", prompt)
                .field("var_name", var_name)
                .finish(),
            Self::Label { name } => f.debug_struct("Label").field("name", name).finish(),
            Self::Jump { target_label } => f
                .debug_struct("Jump")
                .field("target_label", target_label)
                .finish(),
            Self::JumpIf { target_label, .. } => f
                .debug_struct("JumpIf")
                .field("target_label", target_label)
                .finish_non_exhaustive(),
            Self::Branch {
                then_label,
                else_label,
                ..
            } => f
                .debug_struct("Branch")
                .field("then_label", then_label)
                .field("else_label", else_label)
                .finish_non_exhaustive(),
            Self::Wait { ms } => f.debug_struct("Wait").field("ms", ms).finish(),
            Self::WaitClick => f.write_str("WaitClick"),
            Self::Animate {
                target_id,
                property,
                from,
                to,
                duration_ms,
                easing,
            } => f
                .debug_struct("Animate")
                .field("target_id", target_id)
                .field("property", property)
                .field("from", from)
                .field("to", to)
                .field("duration_ms", duration_ms)
                .field("easing", easing)
                .finish(),
            Self::RunCode { id, .. } => f.debug_struct("RunCode").field("id", id).finish_non_exhaustive(),
            Self::UnlockGallery { id } => f.debug_struct("UnlockGallery").field("id", id).finish(),
        }
    }
}

/// 预先解析的跳转目标，与指令一一对应
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JumpSlot {
    /// 非跳转指令
    None,
    /// Jump / JumpIf
    Target(usize),
    /// Branch
    Branch { then_index: usize, else_index: usize },
    /// Choice（与选项顺序一致）
    Choice(Vec<usize>),
}

/// 构建完成的脚本
///
/// 包含指令列表、标签索引和跳转表，构建后不可变。
pub struct Script<U> {
    /// 脚本标识符
    pub id: String,
    instructions: Vec<Instruction<U>>,
    label_index: HashMap<String, usize>,
    jumps: Vec<JumpSlot>,
    /// 指令索引 -> 源文件行号（仅文本前端产生的脚本有）
    source_map: Vec<Option<usize>>,
}

impl<U> Script<U> {
    pub(crate) fn from_parts(
        id: String,
        instructions: Vec<Instruction<U>>,
        label_index: HashMap<String, usize>,
        jumps: Vec<JumpSlot>,
        source_map: Vec<Option<usize>>,
    ) -> Self {
        Self {
            id,
            instructions,
            label_index,
            jumps,
            source_map,
        }
    }

    /// 根据标签名查找指令索引
    pub fn find_label(&self, name: &str) -> Option<usize> {
        self.label_index.get(name).copied()
    }

    /// 获取指定索引的指令
    pub fn get(&self, index: usize) -> Option<&Instruction<U>> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction<U>] {
        &self.instructions
    }

    /// 所有已定义的标签名（按出现顺序）
    pub fn labels(&self) -> Vec<&str> {
        self.instructions.iter().filter_map(|i| i.as_label()).collect()
    }

    /// 指令数量
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// 获取指令对应的源文件行号
    pub fn source_line(&self, index: usize) -> Option<usize> {
        self.source_map.get(index).copied().flatten()
    }

    pub(crate) fn jump_slot(&self, index: usize) -> &JumpSlot {
        self.jumps.get(index).unwrap_or(&JumpSlot::None)
    }
}

impl<U> fmt::Debug for Script<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("id", &self.id)
            .field("instructions", &self.instructions)
            .finish_non_exhaustive()
    }
}
