//! # Scheduler 模块
//!
//! 补间调度器。
//!
//! ```rust,ignore
//! let mut scheduler = AnimationScheduler::new();
//! scheduler.request("miko", "alpha", 1.0, 300, Easing::EaseOut);
//!
//! // 每帧
//! let events = scheduler.update(16);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Easing, Tween};
use crate::event::RuntimeEvent;

/// 补间请求
///
/// 由 `Animate` 指令产生，Director 在 tick 末尾提交给调度器。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationRequest {
    pub target_id: String,
    pub property: String,
    /// 显式起始值；为 None 时从属性当前值开始
    pub from: Option<f32>,
    pub to: f32,
    pub duration_ms: u64,
    pub easing: Easing,
}

/// 补间调度器
///
/// - 每个 (target_id, property) 至多一个活跃补间
/// - 补间按请求顺序更新，事件顺序确定
/// - 与脚本是否处于等待状态无关，始终随时间推进
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    /// 活跃补间（保持请求顺序）
    tweens: Vec<Tween>,
    /// 已结束补间留下的属性值
    settled: BTreeMap<(String, String), f32>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求补间，从属性当前值开始
    ///
    /// 若同一属性已有活跃补间，旧补间被直接丢弃（不产生结束事件），
    /// 新补间从旧补间此刻的插值结果开始，避免画面跳变。
    pub fn request(
        &mut self,
        target_id: &str,
        property: &str,
        end_value: f32,
        duration_ms: u64,
        easing: Easing,
    ) {
        let start = self
            .current_value(target_id, property)
            .unwrap_or(end_value);
        self.insert(Tween::new(
            target_id,
            property,
            start,
            end_value,
            duration_ms,
            easing,
        ));
    }

    /// 提交 `Animate` 指令产生的请求
    ///
    /// 显式 `from` 只在没有活跃补间时生效；替换活跃补间时始终从其插值结果开始。
    pub fn submit(&mut self, request: AnimationRequest) {
        let AnimationRequest {
            target_id,
            property,
            from,
            to,
            duration_ms,
            easing,
        } = request;

        let start = match self.active(&target_id, &property) {
            Some(tween) => tween.current_value(),
            None => from
                .or_else(|| self.current_value(&target_id, &property))
                .unwrap_or(to),
        };
        self.insert(Tween::new(
            target_id,
            property,
            start,
            to,
            duration_ms,
            easing,
        ));
    }

    /// 推进所有补间
    ///
    /// 每个活跃补间产生一个 `Animated` 事件；到达终点的补间输出精确的
    /// `end_value` 后被移除。
    pub fn update(&mut self, dt_ms: u64) -> Vec<RuntimeEvent> {
        let mut events = Vec::with_capacity(self.tweens.len());

        for tween in &mut self.tweens {
            let value = tween.advance(dt_ms);
            events.push(RuntimeEvent::Animated {
                target_id: tween.target_id.clone(),
                property: tween.property.clone(),
                value,
            });
        }

        let settled = &mut self.settled;
        self.tweens.retain(|tween| {
            if tween.is_finished() {
                debug!(target = %tween.target_id, property = %tween.property, value = tween.end_value, "补间完成");
                settled.insert(
                    (tween.target_id.clone(), tween.property.clone()),
                    tween.end_value,
                );
                false
            } else {
                true
            }
        });

        events
    }

    /// 属性当前值：活跃补间的插值结果，否则为最后一次结束时的值
    pub fn current_value(&self, target_id: &str, property: &str) -> Option<f32> {
        match self.active(target_id, property) {
            Some(tween) => Some(tween.current_value()),
            None => self
                .settled
                .get(&(target_id.to_string(), property.to_string()))
                .copied(),
        }
    }

    /// 取消补间（不产生事件），属性停留在当前插值结果
    pub fn cancel(&mut self, target_id: &str, property: &str) {
        if let Some(index) = self.position(target_id, property) {
            let tween = self.tweens.remove(index);
            self.settled.insert(
                (tween.target_id.clone(), tween.property.clone()),
                tween.current_value(),
            );
        }
    }

    /// 清空所有补间与记录的属性值
    pub fn clear(&mut self) {
        self.tweens.clear();
        self.settled.clear();
    }

    pub fn is_animating(&self) -> bool {
        !self.tweens.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.tweens.len()
    }

    /// 活跃补间（只读）
    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }

    fn active(&self, target_id: &str, property: &str) -> Option<&Tween> {
        self.tweens.iter().find(|t| t.matches(target_id, property))
    }

    fn position(&self, target_id: &str, property: &str) -> Option<usize> {
        self.tweens.iter().position(|t| t.matches(target_id, property))
    }

    /// 插入补间，同键替换时保持原有位置
    fn insert(&mut self, tween: Tween) {
        match self.position(&tween.target_id, &tween.property) {
            Some(index) => {
                debug!(
                    target = %tween.target_id,
                    property = %tween.property,
                    start = tween.start_value,
                    "替换活跃补间"
                );
                self.tweens[index] = tween;
            }
            None => self.tweens.push(tween),
        }
    }
}
