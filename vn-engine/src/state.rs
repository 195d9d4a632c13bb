//! # State 模块
//!
//! 定义游戏状态（`GameState`）和脚本执行状态机（`ExecutionStatus`）。
//!
//! ## 设计原则
//!
//! - 所有状态必须**显式建模**，"等待"是数据而不是阻塞的调用栈
//! - 只提供整体读写接口，不提供局部修改 API，快照即复制四个字段
//! - 使用有序容器，保证序列化结果在重放时逐字节一致

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SaveError;

/// 游戏自定义数据的编解码约定
///
/// 由嵌入引擎的游戏提供，引擎本身不关心 `U` 的结构，只在存档/读档时调用。
pub trait UserData: Clone {
    /// 编码为 JSON 值
    fn encode(&self) -> serde_json::Value;

    /// 从 JSON 值解码
    fn decode(value: &serde_json::Value) -> Result<Self, SaveError>;
}

impl UserData for () {
    fn encode(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn decode(_value: &serde_json::Value) -> Result<Self, SaveError> {
        Ok(())
    }
}

/// 游戏状态
///
/// 只在指令执行（内置处理器与 `RunCode` 钩子）期间被修改。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameState<U> {
    flags: BTreeMap<String, bool>,
    int_vars: BTreeMap<String, i64>,
    text_vars: BTreeMap<String, String>,
    user_data: U,
}

impl<U> GameState<U> {
    /// 以初始自定义数据创建状态
    pub fn new(user_data: U) -> Self {
        Self {
            flags: BTreeMap::new(),
            int_vars: BTreeMap::new(),
            text_vars: BTreeMap::new(),
            user_data,
        }
    }

    /// 读取标记，未设置时为 false
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// 读取整数变量，未设置时返回 `default`
    pub fn int_var(&self, name: &str, default: i64) -> i64 {
        self.int_vars.get(name).copied().unwrap_or(default)
    }

    pub fn set_int_var(&mut self, name: impl Into<String>, value: i64) {
        self.int_vars.insert(name.into(), value);
    }

    /// 读取文本变量，未设置时返回 `default`
    pub fn text_var(&self, name: &str, default: &str) -> String {
        self.text_vars
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn set_text_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.text_vars.insert(name.into(), value.into());
    }

    /// 自定义数据（只读）
    pub fn user_data(&self) -> &U {
        &self.user_data
    }

    /// 整体替换自定义数据
    pub fn set_user_data(&mut self, user_data: U) {
        self.user_data = user_data;
    }

    pub fn flags(&self) -> &BTreeMap<String, bool> {
        &self.flags
    }

    pub fn int_vars(&self) -> &BTreeMap<String, i64> {
        &self.int_vars
    }

    pub fn text_vars(&self) -> &BTreeMap<String, String> {
        &self.text_vars
    }
}

impl<U: UserData> GameState<U> {
    /// 从快照的四个字段重建状态
    pub fn from_parts(
        flags: BTreeMap<String, bool>,
        int_vars: BTreeMap<String, i64>,
        text_vars: BTreeMap<String, String>,
        user_data: &serde_json::Value,
    ) -> Result<Self, SaveError> {
        Ok(Self {
            flags,
            int_vars,
            text_vars,
            user_data: U::decode(user_data)?,
        })
    }
}

/// 等待选择时保存的候选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoice {
    /// 选项标识
    pub id: String,
    /// 选项显示文本
    pub text: String,
    /// 已解析的跳转目标（指令索引）
    pub target: usize,
}

/// 脚本执行状态
///
/// # 状态转换
///
/// ```text
/// Running           -> 执行指令，直到遇到阻塞指令或脚本结束
/// WaitingTimer      -> 剩余时间归零后回到 Running
/// WaitingClick      -> 收到 Click 后回到 Running
/// WaitingChoice     -> 收到 ChoiceSelected 后跳转到选项目标并回到 Running
/// WaitingTextInput  -> 收到 TextSubmitted 后写入变量并回到 Running
/// Blocked           -> 外部通知音效播放完毕后回到 Running
/// Ended             -> 终态
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// 正在执行
    #[default]
    Running,

    /// 计时等待
    WaitingTimer { remaining_ms: u64 },

    /// 等待点击
    WaitingClick,

    /// 等待选择
    WaitingChoice { options: Vec<PendingChoice> },

    /// 等待文本输入
    WaitingTextInput { var_name: String },

    /// 被阻塞音效挡住
    Blocked { active_sfx: String },

    /// 执行完毕
    Ended,
}

impl ExecutionStatus {
    /// 是否处于等待/阻塞状态
    pub fn is_waiting(&self) -> bool {
        !matches!(self, Self::Running | Self::Ended)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }

    /// 状态名称（用于错误信息和日志）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::WaitingTimer { .. } => "WaitingTimer",
            Self::WaitingClick => "WaitingClick",
            Self::WaitingChoice { .. } => "WaitingChoice",
            Self::WaitingTextInput { .. } => "WaitingTextInput",
            Self::Blocked { .. } => "Blocked",
            Self::Ended => "Ended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Affection(i32);

    impl UserData for Affection {
        fn encode(&self) -> serde_json::Value {
            serde_json::json!({ "affection": self.0 })
        }

        fn decode(value: &serde_json::Value) -> Result<Self, SaveError> {
            value["affection"]
                .as_i64()
                .map(|v| Affection(v as i32))
                .ok_or_else(|| SaveError::DeserializationFailed("缺少 affection".to_string()))
        }
    }

    #[test]
    fn test_defaults_on_read_miss() {
        let state = GameState::new(());
        assert!(!state.flag("visited"));
        assert_eq!(state.int_var("coins", 7), 7);
        assert_eq!(state.text_var("name", "Aoi"), "Aoi");
    }

    #[test]
    fn test_set_and_read() {
        let mut state = GameState::new(());
        state.set_flag("visited", true);
        state.set_int_var("coins", 3);
        state.set_text_var("name", "Miko");

        assert!(state.flag("visited"));
        assert_eq!(state.int_var("coins", 0), 3);
        assert_eq!(state.text_var("name", ""), "Miko");
    }

    #[test]
    fn test_user_data_replaced_wholesale() {
        let mut state = GameState::new(Affection(1));
        state.set_user_data(Affection(5));
        assert_eq!(state.user_data(), &Affection(5));
    }

    #[test]
    fn test_from_parts_decodes_user_data() {
        let mut state = GameState::new(Affection(3));
        state.set_flag("a", true);

        let encoded = state.user_data().encode();
        let rebuilt = GameState::<Affection>::from_parts(
            state.flags().clone(),
            state.int_vars().clone(),
            state.text_vars().clone(),
            &encoded,
        )
        .unwrap();
        assert_eq!(rebuilt, state);

        let broken = GameState::<Affection>::from_parts(
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            &serde_json::Value::Null,
        );
        assert!(matches!(broken, Err(SaveError::DeserializationFailed(_))));
    }

    #[test]
    fn test_status_predicates() {
        assert!(!ExecutionStatus::Running.is_waiting());
        assert!(!ExecutionStatus::Ended.is_waiting());
        assert!(ExecutionStatus::WaitingClick.is_waiting());
        assert!(ExecutionStatus::WaitingTimer { remaining_ms: 10 }.is_waiting());
        assert!(
            ExecutionStatus::Blocked {
                active_sfx: "bell".to_string()
            }
            .is_blocked()
        );
        assert_eq!(ExecutionStatus::Ended.name(), "Ended");
    }
}
