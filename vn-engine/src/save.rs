//! # Save 模块
//!
//! 存档/读档系统的数据模型与存储约定。
//!
//! ## 设计原则
//!
//! - 所有存档数据必须可序列化（JSON）
//! - 必须有版本号，支持向后兼容检测
//! - 存档粒度是标签：恢复后从最近经过的标签之后重新执行
//! - 核心不做文件 IO，持久化由 [`SaveStore`] 的实现决定

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::error::SaveError;
use crate::history::History;

/// 存档格式版本
///
/// 版本号含义：
/// - MAJOR: 不兼容的格式变更
/// - MINOR: 向后兼容的新字段
pub const SAVE_VERSION_MAJOR: u32 = 1;
pub const SAVE_VERSION_MINOR: u32 = 0;

/// 存档版本信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveVersion {
    pub major: u32,
    pub minor: u32,
}

impl SaveVersion {
    /// 当前版本
    pub fn current() -> Self {
        Self {
            major: SAVE_VERSION_MAJOR,
            minor: SAVE_VERSION_MINOR,
        }
    }

    /// 检查是否兼容
    ///
    /// 兼容规则：
    /// - major 必须相同
    /// - minor 可以不同（向后兼容）
    pub fn is_compatible(&self) -> bool {
        self.major == SAVE_VERSION_MAJOR
    }
}

impl Default for SaveVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for SaveVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// 存档元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    /// 存档槽位号
    pub slot: u32,
    /// 保存时间（RFC 3339），由存储实现填写
    #[serde(default)]
    pub timestamp: Option<String>,
    /// 保存时所在的标签（用于 UI 显示）
    #[serde(default)]
    pub label: Option<String>,
}

impl SaveMetadata {
    pub fn new(slot: u32) -> Self {
        Self {
            slot,
            timestamp: None,
            label: None,
        }
    }

    /// 设置保存时间
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// 游戏快照
///
/// 恢复后的行为只取决于这里的字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// 最近经过的标签（None 表示从脚本开头开始）
    pub current_label: Option<String>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub int_vars: BTreeMap<String, i64>,
    #[serde(default)]
    pub text_vars: BTreeMap<String, String>,
    /// 自定义数据，由 `UserData::encode` 产生
    #[serde(default)]
    pub user_data: serde_json::Value,
    #[serde(default)]
    pub unlocked_gallery_ids: BTreeSet<String>,
    #[serde(default)]
    pub settings: Settings,
}

/// 存档数据
///
/// 包含恢复游戏状态所需的所有信息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// 存档格式版本
    pub version: SaveVersion,
    /// 存档元数据
    pub metadata: SaveMetadata,
    /// 游戏快照
    pub snapshot: GameSnapshot,
    /// 历史记录（只用于回看）
    #[serde(default)]
    pub history: History,
}

impl SaveData {
    /// 创建新的存档数据
    pub fn new(slot: u32, snapshot: GameSnapshot) -> Self {
        let mut metadata = SaveMetadata::new(slot);
        metadata.label = snapshot.current_label.clone();
        Self {
            version: SaveVersion::current(),
            metadata,
            snapshot,
            history: History::new(),
        }
    }

    /// 设置历史记录
    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, SaveError> {
        serde_json::to_string_pretty(self).map_err(|e| SaveError::SerializationFailed(e.to_string()))
    }

    /// 从 JSON 字符串反序列化
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let data: SaveData = serde_json::from_str(json)
            .map_err(|e| SaveError::DeserializationFailed(e.to_string()))?;

        // 检查版本兼容性
        if !data.version.is_compatible() {
            return Err(SaveError::IncompatibleVersion {
                save_version: data.version.to_string(),
                current_version: SaveVersion::current().to_string(),
            });
        }

        Ok(data)
    }
}

/// 存档存储
///
/// 核心只提供内存实现；文件、数据库等由宿主实现。
pub trait SaveStore {
    /// 写入存档（覆盖同槽位）
    fn save(&mut self, data: &SaveData) -> Result<(), SaveError>;

    /// 读取存档，槽位不存在时返回 `MissingSaveSlot`
    fn load(&self, slot: u32) -> Result<SaveData, SaveError>;

    /// 槽位是否存在
    fn exists(&self, slot: u32) -> bool;

    /// 删除存档，槽位不存在时返回 `MissingSaveSlot`
    fn delete(&mut self, slot: u32) -> Result<(), SaveError>;

    /// 所有已占用的槽位（升序）
    fn list_slots(&self) -> Vec<u32>;
}

/// 内存存档存储
///
/// 以 JSON 文本保存，读取时走与文件存储相同的版本检查。
#[derive(Debug, Clone, Default)]
pub struct MemorySaveStore {
    slots: BTreeMap<u32, String>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemorySaveStore {
    fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        let json = data.to_json()?;
        self.slots.insert(data.metadata.slot, json);
        debug!(slot = data.metadata.slot, "存档已写入内存");
        Ok(())
    }

    fn load(&self, slot: u32) -> Result<SaveData, SaveError> {
        let json = self
            .slots
            .get(&slot)
            .ok_or(SaveError::MissingSaveSlot { slot })?;
        SaveData::from_json(json)
    }

    fn exists(&self, slot: u32) -> bool {
        self.slots.contains_key(&slot)
    }

    fn delete(&mut self, slot: u32) -> Result<(), SaveError> {
        self.slots
            .remove(&slot)
            .map(|_| ())
            .ok_or(SaveError::MissingSaveSlot { slot })
    }

    fn list_slots(&self) -> Vec<u32> {
        self.slots.keys().copied().collect()
    }
}
