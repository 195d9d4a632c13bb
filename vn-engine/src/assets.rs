//! # Assets 模块
//!
//! 运行前的资源校验。引擎不加载任何资源，只检查脚本引用的资源 id
//! 是否能在宿主提供的资源表里找到。
//!
//! 图片：背景、立绘、CG；音频：BGM、音效。

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AssetError;
use crate::script::instruction::{Instruction, Script};

/// 资源查询接口，由宿主实现
pub trait AssetLookup {
    /// 图片资源是否存在
    fn has_image(&self, id: &str) -> bool;

    /// 音频资源是否存在
    fn has_audio(&self, id: &str) -> bool;
}

/// 资源清单
///
/// ```json
/// { "images": ["shrine_day", "miko"], "audio": ["theme", "bell"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub images: BTreeSet<String>,
    #[serde(default)]
    pub audio: BTreeSet<String>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文本加载
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_image(mut self, id: impl Into<String>) -> Self {
        self.images.insert(id.into());
        self
    }

    pub fn with_audio(mut self, id: impl Into<String>) -> Self {
        self.audio.insert(id.into());
        self
    }
}

impl AssetLookup for AssetManifest {
    fn has_image(&self, id: &str) -> bool {
        self.images.contains(id)
    }

    fn has_audio(&self, id: &str) -> bool {
        self.audio.contains(id)
    }
}

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// 背景图片
    Background,
    /// 角色立绘
    Figure,
    /// CG
    Gallery,
    /// 背景音乐
    Music,
    /// 音效
    Sfx,
}

impl ResourceType {
    pub fn is_image(self) -> bool {
        matches!(self, Self::Background | Self::Figure | Self::Gallery)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Background => write!(f, "背景"),
            Self::Figure => write!(f, "立绘"),
            Self::Gallery => write!(f, "CG"),
            Self::Music => write!(f, "BGM"),
            Self::Sfx => write!(f, "音效"),
        }
    }
}

/// 资源引用信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// 资源类型
    pub resource_type: ResourceType,
    /// 资源 id
    pub id: String,
    /// 引用所在的指令索引
    pub index: usize,
}

impl ResourceReference {
    fn to_error(&self) -> AssetError {
        if self.resource_type.is_image() {
            AssetError::MissingImageAsset {
                id: self.id.clone(),
            }
        } else {
            AssetError::MissingAudioAsset {
                id: self.id.clone(),
            }
        }
    }

    fn exists(&self, lookup: &impl AssetLookup) -> bool {
        if self.resource_type.is_image() {
            lookup.has_image(&self.id)
        } else {
            lookup.has_audio(&self.id)
        }
    }
}

/// 提取脚本中的所有资源引用（按指令顺序）
pub fn collect_asset_references<U>(script: &Script<U>) -> Vec<ResourceReference> {
    script
        .instructions()
        .iter()
        .enumerate()
        .filter_map(|(index, instruction)| {
            let (resource_type, id) = match instruction {
                Instruction::ShowBackground { id } => (ResourceType::Background, id),
                Instruction::ShowFigure { id, .. } => (ResourceType::Figure, id),
                Instruction::UnlockGallery { id } => (ResourceType::Gallery, id),
                Instruction::PlayMusic { track, .. } => (ResourceType::Music, track),
                Instruction::PlaySfx { track, .. } => (ResourceType::Sfx, track),
                _ => return None,
            };
            Some(ResourceReference {
                resource_type,
                id: id.clone(),
                index,
            })
        })
        .collect()
}

/// 找出所有缺失的资源引用
pub fn find_missing_assets<U>(
    script: &Script<U>,
    lookup: &impl AssetLookup,
) -> Vec<ResourceReference> {
    collect_asset_references(script)
        .into_iter()
        .filter(|reference| !reference.exists(lookup))
        .collect()
}

/// 校验脚本引用的资源，返回按指令顺序遇到的第一个缺失资源
pub fn validate_script_assets<U>(
    script: &Script<U>,
    lookup: &impl AssetLookup,
) -> Result<(), AssetError> {
    match find_missing_assets(script, lookup).first() {
        Some(reference) => Err(reference.to_error()),
        None => Ok(()),
    }
}
