//! # Error 模块
//!
//! 定义 vn-engine 中使用的错误类型。
//!
//! 错误按发生阶段分组：
//!
//! - [`BuildError`]：`ScriptBuilder::finalize` 阶段（标签解析）
//! - [`ParseError`]：文本脚本前端
//! - [`AssetError`]：运行前的资源校验
//! - [`SaveError`]：存档/读档
//! - [`RuntimeError`]：Host 与引擎之间的协议违规

use thiserror::Error;

/// 构建错误
///
/// 只会在 `finalize()` 时产生，执行期间不会再出现未解析的跳转。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// 标签重复定义
    #[error("标签 '{name}' 重复定义")]
    DuplicateLabel { name: String },

    /// 跳转目标未定义
    #[error("标签 '{name}' 未找到")]
    LabelNotFound { name: String },
}

/// 文本脚本解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// 无法识别的行格式
    #[error("第 {line} 行：无效的格式 - {raw}")]
    MalformedLine { line: usize, raw: String },

    /// 未知指令
    #[error("第 {line} 行：未知指令 '{command}'")]
    UnknownCommand { line: usize, command: String },

    /// 缺少必需参数
    #[error("第 {line} 行：指令 '{command}' 缺少参数 '{param}'")]
    MissingParameter {
        line: usize,
        command: String,
        param: String,
    },

    /// 无效的参数值
    #[error("第 {line} 行：参数 '{param}' 的值无效 - {message}")]
    InvalidParameter {
        line: usize,
        param: String,
        message: String,
    },
}

impl ParseError {
    /// 出错的行号（从 1 开始）
    pub fn line(&self) -> usize {
        match self {
            Self::MalformedLine { line, .. }
            | Self::UnknownCommand { line, .. }
            | Self::MissingParameter { line, .. }
            | Self::InvalidParameter { line, .. } => *line,
        }
    }
}

/// 资源校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// 图片资源（背景/立绘/CG）不存在
    #[error("图片资源 '{id}' 不存在")]
    MissingImageAsset { id: String },

    /// 音频资源（BGM/SFX）不存在
    #[error("音频资源 '{id}' 不存在")]
    MissingAudioAsset { id: String },
}

/// 存档错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    /// 存档槽位不存在
    #[error("存档槽位 {slot} 不存在")]
    MissingSaveSlot { slot: u32 },

    /// 存档中记录的标签在当前脚本里不存在
    #[error("存档标签 '{label}' 在脚本中不存在")]
    UnknownLabel { label: String },

    /// 序列化失败
    #[error("序列化失败: {0}")]
    SerializationFailed(String),

    /// 反序列化失败
    #[error("反序列化失败: {0}")]
    DeserializationFailed(String),

    /// 版本不兼容
    #[error("存档版本不兼容: 存档版本 {save_version} vs 当前版本 {current_version}")]
    IncompatibleVersion {
        save_version: String,
        current_version: String,
    },

    /// 存储后端失败（由 Host 的 SaveStore 实现产生）
    #[error("存储失败: {0}")]
    Storage(String),
}

/// 运行时错误
///
/// 均表示 Host 集成层的编程错误，而不是数据问题。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// 无效的选择索引
    #[error("无效的选择索引 {index}，有效范围是 0..{max}")]
    InvalidChoiceIndex { index: usize, max: usize },

    /// 当前状态不接受该输入
    #[error("当前状态不允许此操作：期望 {expected}，实际 {actual}")]
    StateMismatch { expected: String, actual: String },
}

/// vn-engine 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VnError {
    /// 构建错误
    #[error("构建错误: {0}")]
    Build(#[from] BuildError),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),

    /// 资源错误
    #[error("资源错误: {0}")]
    Asset(#[from] AssetError),

    /// 存档错误
    #[error("存档错误: {0}")]
    Save(#[from] SaveError),

    /// 运行时错误
    #[error("运行时错误: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Result 类型别名
pub type VnResult<T> = Result<T, VnError>;
