//! 块缓存模块
//!
//! 这个模块提供分桶的块缓存实现，对应 xv6 的 `bio.c`。
//!
//! # 主要组件
//!
//! - [`BufCache`] - 槽位池与哈希桶目录，提供 acquire / read / write / release / pin / unpin
//! - [`Buf`] - 持有内容锁的缓存块句柄
//! - [`PinnedSlot`] - 钉住槽位的凭据
//! - [`CacheConfig`] - 槽位数、桶数、块大小
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 设计原理
//!
//! | xv6 C                         | bcache_core                          |
//! |-------------------------------|--------------------------------------|
//! | `struct buf`                  | `Slot`（槽位数组中的一项）             |
//! | `bcache.head[NBUCKET]`        | `Bucket`（自旋锁 + 下标链表表头）       |
//! | `b->next` / `b->prev` 指针     | `SlotId` 下标，`HEAD` 哨兵            |
//! | `struct sleeplock`            | [`SleepLock`](crate::sync::SleepLock) |
//! | `bget()`                      | [`BufCache::acquire()`]              |
//! | `bread()`                     | [`BufCache::read()`]                 |
//! | `bwrite()`                    | [`BufCache::write()`]                |
//! | `brelse()`                    | [`BufCache::release()`] / drop       |
//! | `bpin()` / `bunpin()`         | [`BufCache::pin()`] / [`BufCache::unpin()`] |
//! | `b->lastuse = ticks`          | [`TickSource`](crate::sync::TickSource) |
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bcache_core::{BufCache, CacheConfig, LogicalClock, MemDisk};
//!
//! let clock = Arc::new(LogicalClock::new());
//! let cache = BufCache::new(CacheConfig::default(), MemDisk::new(1024, 4096), clock)?;
//!
//! let mut buf = cache.read(1, 42)?;
//! buf.data_mut()[0] = 0x42;
//! buf.write()?;
//! buf.release();
//! ```

mod bcache;
mod bucket;
mod config;
mod handle;
mod slot;
mod stats;

pub use bcache::BufCache;
pub use config::CacheConfig;
pub use handle::{Buf, PinnedSlot};
pub use slot::{SlotId, SlotInfo};
pub use stats::CacheStats;
