//! # Config 模块
//!
//! 无界面宿主的配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use vn_engine::{EngineConfig, Settings};

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO 错误: {0}")]
    IoError(String),

    #[error("配置解析失败: {0}")]
    ParseFailed(String),

    #[error("序列化失败: {0}")]
    SerializationFailed(String),
}

/// 宿主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// 入口脚本路径（命令行未指定时使用）
    #[serde(default)]
    pub script_path: Option<PathBuf>,

    /// 存档目录
    #[serde(default = "default_saves_dir")]
    pub saves_dir: PathBuf,

    /// 资源清单路径，配置后运行前校验脚本引用的资源
    #[serde(default)]
    pub asset_manifest: Option<PathBuf>,

    /// 每帧时长（毫秒）
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,

    /// 自动推进时提交的文本
    #[serde(default = "default_text")]
    pub default_text: String,

    /// 玩家设置
    #[serde(default)]
    pub settings: Settings,

    /// 引擎行为配置
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            script_path: None,
            saves_dir: default_saves_dir(),
            asset_manifest: None,
            frame_ms: default_frame_ms(),
            default_text: default_text(),
            settings: Settings::default(),
            engine: EngineConfig::default(),
        }
    }
}

fn default_saves_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_frame_ms() -> u64 {
    16
}

fn default_text() -> String {
    "player".to_string()
}

impl HostConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置；存在但无法解析时返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        info!(path = %path.display(), "配置文件加载成功");
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}
