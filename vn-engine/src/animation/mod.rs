//! # Animation 模块
//!
//! 时间驱动的补间调度器，独立于脚本执行位置推进。
//!
//! ## 核心设计
//!
//! 调度器只负责 **时间轴管理**：
//! - 知道某个属性从 A 到 B 需要在 duration 内变化
//! - 每次 `update` 为活跃补间产生 `Animated` 事件
//! - **不假设目标类型**，目标与属性都只是字符串标识
//!
//! ## 核心概念
//!
//! - [`Easing`]：缓动函数
//! - [`Tween`]：单个补间实例
//! - [`AnimationRequest`]：`Animate` 指令产生的补间请求
//! - [`AnimationScheduler`]：补间列表管理器，每个 (target, property) 至多一个活跃补间

mod easing;
mod scheduler;
mod tween;

pub use easing::Easing;
pub use scheduler::{AnimationRequest, AnimationScheduler};
pub use tween::Tween;
