//! # SaveStore 模块
//!
//! 基于文件的存档存储。
//!
//! ## 文件布局
//!
//! ```text
//! saves/
//! ├── slot_001.json
//! ├── slot_002.json
//! └── ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;
use vn_engine::{SaveData, SaveError, SaveStore};

/// 文件存档存储
pub struct FileSaveStore {
    /// 存档目录
    saves_dir: PathBuf,
}

impl FileSaveStore {
    pub fn new(saves_dir: impl AsRef<Path>) -> Self {
        Self {
            saves_dir: saves_dir.as_ref().to_path_buf(),
        }
    }

    /// 确保存档目录存在
    fn ensure_dir(&self) -> Result<(), SaveError> {
        if !self.saves_dir.exists() {
            fs::create_dir_all(&self.saves_dir)
                .map_err(|e| SaveError::Storage(format!("无法创建存档目录: {}", e)))?;
        }
        Ok(())
    }

    /// 获取存档文件路径
    pub fn slot_path(&self, slot: u32) -> PathBuf {
        self.saves_dir.join(format!("slot_{:03}.json", slot))
    }
}

/// 从 `slot_XXX.json` 解析槽位号
fn parse_slot(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("slot_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

impl SaveStore for FileSaveStore {
    /// 写入存档，时间戳在这里填写
    fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        self.ensure_dir()?;

        let mut data = data.clone();
        data.metadata.timestamp = Some(Utc::now().to_rfc3339());

        let path = self.slot_path(data.metadata.slot);
        fs::write(&path, data.to_json()?)
            .map_err(|e| SaveError::Storage(format!("无法写入存档文件: {}", e)))?;

        info!(path = %path.display(), "存档保存成功");
        Ok(())
    }

    fn load(&self, slot: u32) -> Result<SaveData, SaveError> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Err(SaveError::MissingSaveSlot { slot });
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| SaveError::Storage(format!("无法读取存档文件: {}", e)))?;
        let data = SaveData::from_json(&json)?;

        info!(path = %path.display(), "存档读取成功");
        Ok(data)
    }

    fn exists(&self, slot: u32) -> bool {
        self.slot_path(slot).exists()
    }

    fn delete(&mut self, slot: u32) -> Result<(), SaveError> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Err(SaveError::MissingSaveSlot { slot });
        }

        fs::remove_file(&path)
            .map_err(|e| SaveError::Storage(format!("无法删除存档文件: {}", e)))?;
        info!(path = %path.display(), "存档删除成功");
        Ok(())
    }

    fn list_slots(&self) -> Vec<u32> {
        let Ok(entries) = fs::read_dir(&self.saves_dir) else {
            return Vec::new();
        };

        let mut slots: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| parse_slot(entry.file_name().to_str()?))
            .collect();
        slots.sort_unstable();
        slots
    }
}
