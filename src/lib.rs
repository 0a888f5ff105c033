//! bcache_core: 分桶块缓存
//!
//! 位于块设备与文件系统之间的内存块缓存：
//! - 固定数量的定长槽位，按块号哈希分布到带锁的桶中
//! - 命中时直接返回缓存的块，不访问设备
//! - 每个槽位一把可睡眠的内容锁，保证调用方不会看到写了一半的块
//! - 引用计数与空闲时刻驱动回收：先在本桶找，再按固定顺序全局扫描
//!
//! # 示例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bcache_core::{BufCache, CacheConfig, LogicalClock, MemDisk, Result};
//!
//! fn main() -> Result<()> {
//!     let clock = Arc::new(LogicalClock::new());
//!     let cache = BufCache::new(CacheConfig::default(), MemDisk::new(1024, 4096), clock.clone())?;
//!
//!     let buf = cache.read(1, 7)?;
//!     println!("First byte: {:02x}", buf.data()[0]);
//!     buf.release();
//!
//!     clock.tick();
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`block`] - 块设备接口和内存块设备
//! - [`sync`] - 睡眠锁与逻辑时钟
//! - [`cache`] - 分桶块缓存
//! - [`consts`] - 默认配置常量

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

/// 错误处理
pub mod error;

/// 块设备抽象
pub mod block;

/// 常量定义
pub mod consts;

/// 同步原语
pub mod sync;

/// 块缓存
pub mod cache;

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 块设备
pub use block::{BlockDevice, BlockNo, DeviceId, MemDisk};

// 同步原语
pub use sync::{LogicalClock, SleepLock, SleepLockGuard, Tick, TickSource};

// 缓存
pub use cache::{Buf, BufCache, CacheConfig, CacheStats, PinnedSlot, SlotId, SlotInfo};
