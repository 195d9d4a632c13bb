//! # Config 模块
//!
//! 引擎内的两类配置：
//!
//! - [`Settings`]：玩家可调整的会话设置，随存档一起保存
//! - [`EngineConfig`]：嵌入方在构造时决定的引擎行为，不进入存档
//!
//! 所有字段都带 serde 默认值，旧存档缺字段时按默认值补齐。

use serde::{Deserialize, Serialize};

/// 玩家设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// 逐字显示间隔（毫秒）
    #[serde(default = "default_text_speed_ms")]
    pub text_speed_ms: u32,

    /// BGM 音量 (0.0 - 1.0)
    #[serde(default = "default_bgm_volume")]
    pub bgm_volume: f32,

    /// SFX 音量 (0.0 - 1.0)
    #[serde(default = "default_sfx_volume")]
    pub sfx_volume: f32,

    /// 快进模式：脚本中的计时等待全部视为 0
    #[serde(default)]
    pub skip_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_speed_ms: default_text_speed_ms(),
            bgm_volume: default_bgm_volume(),
            sfx_volume: default_sfx_volume(),
            skip_mode: false,
        }
    }
}

impl Settings {
    /// 把音量限制到 0.0 - 1.0
    pub fn clamped(mut self) -> Self {
        self.bgm_volume = self.bgm_volume.clamp(0.0, 1.0);
        self.sfx_volume = self.sfx_volume.clamp(0.0, 1.0);
        self
    }
}

/// 引擎行为配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 阻塞音效是否让脚本进入 `Blocked`，直到 `sfx_finished` 被调用
    ///
    /// 关闭后阻塞音效与普通音效一样只产生事件。
    #[serde(default = "default_gate_blocking_sfx")]
    pub gate_blocking_sfx: bool,

    /// 历史记录容量
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gate_blocking_sfx: default_gate_blocking_sfx(),
            history_capacity: default_history_capacity(),
        }
    }
}

// 默认值函数
fn default_text_speed_ms() -> u32 {
    30
}

fn default_bgm_volume() -> f32 {
    0.8
}

fn default_sfx_volume() -> f32 {
    1.0
}

fn default_gate_blocking_sfx() -> bool {
    true
}

fn default_history_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.text_speed_ms, 30);
        assert_eq!(settings.bgm_volume, 0.8);
        assert!(!settings.skip_mode);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"skip_mode": true}"#).unwrap();
        assert!(settings.skip_mode);
        assert_eq!(settings.sfx_volume, 1.0);

        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.gate_blocking_sfx);
        assert_eq!(config.history_capacity, 1000);
    }

    #[test]
    fn test_clamped_volumes() {
        let settings = Settings {
            bgm_volume: 1.5,
            sfx_volume: -0.2,
            ..Settings::default()
        }
        .clamped();
        assert_eq!(settings.bgm_volume, 1.0);
        assert_eq!(settings.sfx_volume, 0.0);
    }
}
