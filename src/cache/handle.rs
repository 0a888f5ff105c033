//! 缓存块句柄 - RAII 风格的块访问
//!
//! [`Buf`] 表示调用方持有某个槽位的一个引用以及它的内容锁。
//! 句柄被 drop（或显式 [`Buf::release`]）时，先释放内容锁，
//! 再在槽位所在桶内递减引用计数；计数归零时记录空闲时刻，槽位即可被回收。
//!
//! # 示例
//!
//! ```rust,ignore
//! let mut buf = cache.read(dev, 42)?;
//! buf.with_data_mut(|data| data[0] = 0x42);
//! buf.write()?;
//! buf.release();
//! ```

use super::bcache::BufCache;
use super::slot::SlotId;
use crate::block::{BlockDevice, BlockNo, DeviceId};
use crate::error::Result;
use crate::sync::SleepLockGuard;
use alloc::boxed::Box;

/// 槽位引用，drop 时归还引用计数
struct SlotRef<'a, D: BlockDevice> {
    cache: &'a BufCache<D>,
    slot: SlotId,
    dev: DeviceId,
    blockno: BlockNo,
}

impl<D: BlockDevice> Drop for SlotRef<'_, D> {
    fn drop(&mut self) {
        self.cache.put(self.slot, self.dev, self.blockno, "brelse");
    }
}

/// 缓存块句柄
///
/// 持有期间独占该块的数据；句柄不能跨线程移动。
pub struct Buf<'a, D: BlockDevice> {
    // 字段按声明顺序 drop：先释放内容锁，再归还引用
    guard: SleepLockGuard<'a, Box<[u8]>>,
    held: SlotRef<'a, D>,
}

impl<'a, D: BlockDevice> Buf<'a, D> {
    pub(crate) fn new(
        cache: &'a BufCache<D>,
        slot: SlotId,
        dev: DeviceId,
        blockno: BlockNo,
        guard: SleepLockGuard<'a, Box<[u8]>>,
    ) -> Self {
        Self {
            guard,
            held: SlotRef {
                cache,
                slot,
                dev,
                blockno,
            },
        }
    }

    /// 槽位 ID
    pub fn slot(&self) -> SlotId {
        self.held.slot
    }

    /// 设备号
    pub fn device(&self) -> DeviceId {
        self.held.dev
    }

    /// 块号
    pub fn block(&self) -> BlockNo {
        self.held.blockno
    }

    /// 数据是否已从设备读入
    pub fn is_valid(&self) -> bool {
        self.held.cache.slot_ref(self.held.slot).is_valid()
    }

    /// 块数据
    pub fn data(&self) -> &[u8] {
        &self.guard
    }

    /// 可变块数据
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.guard
    }

    /// 以只读方式访问块数据
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.data())
    }

    /// 以可变方式访问块数据
    pub fn with_data_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(self.data_mut())
    }

    /// 把块数据写回设备，见 [`BufCache::write`]
    pub fn write(&self) -> Result<()> {
        self.held.cache.write(self)
    }

    /// 钉住槽位，见 [`BufCache::pin`]
    pub fn pin(&self) -> PinnedSlot<'a, D> {
        self.held.cache.pin(self)
    }

    /// 释放句柄
    pub fn release(self) {
        log::trace!(
            "[BCACHE] release dev={} block={} slot={}",
            self.held.dev,
            self.held.blockno,
            self.held.slot
        );
    }

    /// 当前线程是否持有该槽位的内容锁
    pub(crate) fn holding(&self) -> bool {
        self.guard.lock().holding()
    }

    pub(crate) fn owner(&self) -> &'a BufCache<D> {
        self.held.cache
    }
}

impl<D: BlockDevice> core::fmt::Debug for Buf<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Buf")
            .field("slot", &self.held.slot)
            .field("dev", &self.held.dev)
            .field("blockno", &self.held.blockno)
            .field("data_len", &self.guard.len())
            .finish()
    }
}

/// 钉住的槽位
///
/// 由 [`BufCache::pin`] 返回，必须交还给签发它的缓存的 [`BufCache::unpin`]；
/// 在此之前槽位保持驻留，不会被选为回收对象。
#[must_use = "a pinned slot stays resident until passed to unpin"]
pub struct PinnedSlot<'a, D: BlockDevice> {
    pub(crate) cache: &'a BufCache<D>,
    pub(crate) slot: SlotId,
    pub(crate) dev: DeviceId,
    pub(crate) blockno: BlockNo,
}

impl<D: BlockDevice> PinnedSlot<'_, D> {
    /// 槽位 ID
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// 设备号
    pub fn device(&self) -> DeviceId {
        self.dev
    }

    /// 块号
    pub fn block(&self) -> BlockNo {
        self.blockno
    }
}

impl<D: BlockDevice> core::fmt::Debug for PinnedSlot<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PinnedSlot")
            .field("slot", &self.slot)
            .field("dev", &self.dev)
            .field("blockno", &self.blockno)
            .finish()
    }
}
