//! 退避策略

use std::time::Duration;

/// 指数退避：`initial * multiplier^retry`，不超过 `max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    initial: Duration,
    multiplier: f64,
    max: Duration,
}

impl BackoffPolicy {
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Self {
            initial,
            multiplier: if multiplier.is_finite() && multiplier >= 1.0 {
                multiplier
            } else {
                1.0
            },
            max: max.max(initial),
        }
    }

    /// 不等待，测试和离线场景使用
    pub fn none() -> Self {
        Self::new(Duration::ZERO, 1.0, Duration::ZERO)
    }

    /// 第 `retry` 次连续失败后的等待时间（从 0 开始）
    pub fn delay(&self, retry: usize) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);
        let secs = self.initial.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500), 1.5, Duration::from_secs(30))
    }
}
