//! # Easing 模块
//!
//! 缓动函数库，用于补间的时间插值。

use std::f32::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    /// 线性（匀速）
    #[default]
    Linear,
    /// 缓入：`t²`
    EaseIn,
    /// 缓出：`1 - (1 - t)²`
    EaseOut,
    /// 缓入缓出：三次 Hermite 混合 `t²(3 - 2t)`
    EaseInOut,
    /// 三次缓入
    EaseInCubic,
    /// 三次缓出
    EaseOutCubic,
    /// 正弦缓入缓出
    EaseInOutSine,
    /// 弹跳缓出
    EaseOutBounce,
}

impl Easing {
    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 时间进度，超出 0.0 - 1.0 时被截断
    ///
    /// # 返回
    /// - 缓动后的进度值
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => t * t * (3.0 - 2.0 * t),
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::EaseOutBounce => ease_out_bounce(t),
        }
    }
}

impl FromStr for Easing {
    type Err = ();

    /// 从字符串解析（不区分大小写，忽略 `_` 与 `-`）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "linear" => Ok(Self::Linear),
            "easein" => Ok(Self::EaseIn),
            "easeout" => Ok(Self::EaseOut),
            "easeinout" => Ok(Self::EaseInOut),
            "easeincubic" => Ok(Self::EaseInCubic),
            "easeoutcubic" => Ok(Self::EaseOutCubic),
            "easeinoutsine" => Ok(Self::EaseInOutSine),
            "easeoutbounce" => Ok(Self::EaseOutBounce),
            _ => Err(()),
        }
    }
}

/// 弹跳缓出
fn ease_out_bounce(t: f32) -> f32 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        let easing = Easing::Linear;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(0.5), 0.5);
        assert_eq!(easing.apply(1.0), 1.0);
    }

    #[test]
    fn test_quadratic_curves() {
        assert_eq!(Easing::EaseIn.apply(0.5), 0.25);
        assert_eq!(Easing::EaseOut.apply(0.5), 0.75);
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let easing = Easing::EaseInOut;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(0.5), 0.5);
        assert_eq!(easing.apply(1.0), 1.0);
        let a = easing.apply(0.25);
        let b = easing.apply(0.75);
        assert!((a + b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamp() {
        let easing = Easing::Linear;
        assert_eq!(easing.apply(-0.5), 0.0);
        assert_eq!(easing.apply(1.5), 1.0);
    }

    #[test]
    fn test_ease_out_bounce_endpoints() {
        let easing = Easing::EaseOutBounce;
        assert_eq!(easing.apply(0.0), 0.0);
        assert!((easing.apply(1.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("linear".parse::<Easing>(), Ok(Easing::Linear));
        assert_eq!("ease_in_out".parse::<Easing>(), Ok(Easing::EaseInOut));
        assert_eq!("EaseOut".parse::<Easing>(), Ok(Easing::EaseOut));
        assert_eq!("ease-out-bounce".parse::<Easing>(), Ok(Easing::EaseOutBounce));
        assert!("wobble".parse::<Easing>().is_err());
    }
}
