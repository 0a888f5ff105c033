//! 逻辑时钟
//!
//! 缓存只读取时钟，从不推进它；推进由外部（例如定时器中断）完成。

use core::sync::atomic::{AtomicU32, Ordering};

/// 逻辑时间戳
pub type Tick = u32;

/// 逻辑时钟来源
///
/// 只要求单调不减；回绕由 [`age`] 处理。
///
/// # 示例
///
/// ```ignore
/// struct TimerTicks;
/// impl TickSource for TimerTicks {
///     fn now(&self) -> Tick {
///         TICKS.load(Ordering::Relaxed)
///     }
/// }
/// ```
pub trait TickSource: Send + Sync {
    /// 读取当前时刻
    fn now(&self) -> Tick;
}

/// 进程共享的逻辑时钟计数器
#[derive(Debug, Default)]
pub struct LogicalClock {
    ticks: AtomicU32,
}

impl LogicalClock {
    /// 创建从 0 开始的时钟
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// 创建从指定时刻开始的时钟
    pub const fn starting_at(start: Tick) -> Self {
        Self {
            ticks: AtomicU32::new(start),
        }
    }

    /// 推进一个时钟周期，返回推进后的时刻
    pub fn tick(&self) -> Tick {
        self.advance(1)
    }

    /// 推进 `n` 个时钟周期（回绕），返回推进后的时刻
    pub fn advance(&self, n: Tick) -> Tick {
        self.ticks.fetch_add(n, Ordering::Relaxed).wrapping_add(n)
    }

    /// 直接设置当前时刻
    pub fn set(&self, ticks: Tick) {
        self.ticks.store(ticks, Ordering::Relaxed);
    }
}

impl TickSource for LogicalClock {
    fn now(&self) -> Tick {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// 计算时间戳 `stamp` 在时刻 `now` 时的空闲时长
///
/// 以回绕差值计算，晚于 `now` 的时间戳（差值超过半个计数空间）视为 0。
pub fn age(now: Tick, stamp: Tick) -> Tick {
    let delta = now.wrapping_sub(stamp);
    if delta > Tick::MAX / 2 {
        0
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advance() {
        let clock = LogicalClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.advance(9), 10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn test_clock_wraps() {
        let clock = LogicalClock::starting_at(Tick::MAX);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn test_age_plain() {
        assert_eq!(age(100, 40), 60);
        assert_eq!(age(100, 100), 0);
    }

    #[test]
    fn test_age_across_wraparound() {
        // stamp 在回绕前，now 在回绕后
        assert_eq!(age(5, Tick::MAX - 1), 7);
        assert!(age(5, Tick::MAX - 1) > age(5, 3));
    }

    #[test]
    fn test_age_future_stamp_is_zero() {
        // 扫描期间其他线程释放槽位，时间戳可能晚于快照时刻
        assert_eq!(age(10, 11), 0);
    }
}
