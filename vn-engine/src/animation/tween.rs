//! # Tween 模块
//!
//! 单个补间实例：管理一个 f32 值在 `duration_ms` 内从起点到终点的变化。

use super::Easing;

/// 补间实例
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    /// 目标标识
    pub target_id: String,
    /// 属性名
    pub property: String,
    /// 起始值
    pub start_value: f32,
    /// 目标值
    pub end_value: f32,
    /// 已经过的时间（毫秒）
    pub elapsed_ms: u64,
    /// 时长（毫秒）
    pub duration_ms: u64,
    /// 缓动函数
    pub easing: Easing,
}

impl Tween {
    pub fn new(
        target_id: impl Into<String>,
        property: impl Into<String>,
        start_value: f32,
        end_value: f32,
        duration_ms: u64,
        easing: Easing,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            property: property.into(),
            start_value,
            end_value,
            elapsed_ms: 0,
            duration_ms,
            easing,
        }
    }

    /// 是否作用于指定 (target, property)
    pub fn matches(&self, target_id: &str, property: &str) -> bool {
        self.target_id == target_id && self.property == property
    }

    /// 是否已到达终点
    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    /// 归一化进度（0.0 - 1.0，未应用缓动）
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (self.elapsed_ms as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
    }

    /// 当前插值结果
    ///
    /// 到达终点后精确等于 `end_value`，不会出现浮点误差。
    pub fn current_value(&self) -> f32 {
        if self.is_finished() {
            return self.end_value;
        }
        let t = self.easing.apply(self.progress());
        self.start_value + (self.end_value - self.start_value) * t
    }

    /// 推进时间并返回新的当前值
    pub fn advance(&mut self, dt_ms: u64) -> f32 {
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        self.current_value()
    }
}
