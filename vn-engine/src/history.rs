//! # History 模块
//!
//! 历史记录数据模型，用于支持回看（backlog）功能。
//!
//! ## 设计原则
//!
//! - 只记录玩家看到或做出的内容：对话、选择、文本输入
//! - 不携带时间戳，相同输入序列产生相同历史
//! - 容量有上限，超出时丢弃最早的记录

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// 历史事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEvent {
    /// 对话事件
    Dialogue {
        /// 说话者（None 表示旁白）
        speaker: Option<String>,
        /// 对话内容
        content: String,
    },

    /// 选择事件
    ChoiceMade {
        /// 选项文本列表（所有可选项）
        options: Vec<String>,
        /// 选择的索引
        selected_index: usize,
    },

    /// 文本输入
    TextSubmitted {
        /// 写入的变量名
        var_name: String,
        /// 提交的文本
        text: String,
    },
}

impl HistoryEvent {
    /// 创建对话事件
    pub fn dialogue(speaker: Option<String>, content: impl Into<String>) -> Self {
        HistoryEvent::Dialogue {
            speaker,
            content: content.into(),
        }
    }

    /// 创建选择事件
    pub fn choice_made(options: Vec<String>, selected_index: usize) -> Self {
        HistoryEvent::ChoiceMade {
            options,
            selected_index,
        }
    }

    /// 创建文本输入事件
    pub fn text_submitted(var_name: impl Into<String>, text: impl Into<String>) -> Self {
        HistoryEvent::TextSubmitted {
            var_name: var_name.into(),
            text: text.into(),
        }
    }
}

/// 历史记录容器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    /// 事件列表（按时间顺序）
    events: VecDeque<HistoryEvent>,
    /// 最大记录数
    max_events: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// 创建新的历史记录，默认最多 1000 条
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// 指定最大记录数
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_events,
        }
    }

    /// 添加事件，超过容量时移除最早的事件
    pub fn push(&mut self, event: HistoryEvent) {
        self.events.push_back(event);
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    /// 按时间顺序遍历所有事件
    pub fn events(&self) -> impl Iterator<Item = &HistoryEvent> {
        self.events.iter()
    }

    /// 获取对话事件数量
    pub fn dialogue_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HistoryEvent::Dialogue { .. }))
            .count()
    }

    /// 获取最近的 N 条对话（按时间顺序）
    pub fn recent_dialogues(&self, count: usize) -> Vec<&HistoryEvent> {
        let mut recent: Vec<_> = self
            .events
            .iter()
            .rev()
            .filter(|e| matches!(e, HistoryEvent::Dialogue { .. }))
            .take(count)
            .collect();
        recent.reverse();
        recent
    }

    /// 清空历史
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn capacity(&self) -> usize {
        self.max_events
    }

    /// 获取事件总数
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
