//! 同步原语
//!
//! - [`SleepLock`] - 槽位内容锁，可跨 I/O 持有
//! - [`TickSource`] / [`LogicalClock`] - 记录槽位空闲时刻的逻辑时钟

mod clock;
mod sleeplock;

pub use clock::{age, LogicalClock, Tick, TickSource};
pub use sleeplock::{SleepLock, SleepLockGuard};
