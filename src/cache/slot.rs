//! 缓存槽位
//!
//! 槽位保存在定长数组（arena）中，以下标 [`SlotId`] 互相引用。
//! 除 `data` 外的元数据都只在持有槽位所在桶的桶锁时修改，
//! 桶锁提供了必要的顺序保证，因此原子量一律使用 `Relaxed`。
//! `valid` 例外：它在持有内容锁时由读入数据的线程置位。
//!
//! 从未改派过的槽位没有块标识，不与任何 `(dev, blockno)` 匹配，
//! 回收时视为空闲最久。

use crate::block::{BlockNo, DeviceId};
use crate::consts::HEAD;
use crate::sync::{SleepLock, Tick};
use alloc::boxed::Box;
use alloc::vec;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// 槽位 ID（槽位数组下标）
pub type SlotId = usize;

/// 槽位元数据快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    /// 设备号
    pub device: DeviceId,
    /// 块号
    pub block: BlockNo,
    /// 是否已分配给某个块，为 `false` 时 `device`/`block` 无意义
    pub assigned: bool,
    /// 数据是否已从设备读入
    pub valid: bool,
    /// 引用计数
    pub refcnt: u32,
    /// 最近一次引用计数归零的时刻
    pub recency: Tick,
    /// 当前所在桶
    pub bucket: usize,
}

pub(crate) struct Slot {
    device: AtomicU32,
    block: AtomicU64,
    assigned: AtomicBool,
    valid: AtomicBool,
    refcnt: AtomicU32,
    recency: AtomicU32,
    bucket: AtomicUsize,
    next: AtomicUsize,
    prev: AtomicUsize,
    pub(crate) data: SleepLock<Box<[u8]>>,
}

impl Slot {
    pub(crate) fn new(block_size: usize) -> Self {
        Self {
            device: AtomicU32::new(0),
            block: AtomicU64::new(0),
            assigned: AtomicBool::new(false),
            valid: AtomicBool::new(false),
            refcnt: AtomicU32::new(0),
            recency: AtomicU32::new(0),
            bucket: AtomicUsize::new(0),
            next: AtomicUsize::new(HEAD),
            prev: AtomicUsize::new(HEAD),
            data: SleepLock::new("buffer", vec![0u8; block_size].into_boxed_slice()),
        }
    }

    pub(crate) fn matches(&self, dev: DeviceId, blockno: BlockNo) -> bool {
        self.is_assigned()
            && self.device.load(Ordering::Relaxed) == dev
            && self.block.load(Ordering::Relaxed) == blockno
    }

    pub(crate) fn is_assigned(&self) -> bool {
        self.assigned.load(Ordering::Relaxed)
    }

    /// 把槽位改派给新的块，调用方成为唯一引用者
    pub(crate) fn claim(&self, dev: DeviceId, blockno: BlockNo) {
        debug_assert_eq!(self.refcnt(), 0);
        self.device.store(dev, Ordering::Relaxed);
        self.block.store(blockno, Ordering::Relaxed);
        self.assigned.store(true, Ordering::Relaxed);
        self.valid.store(false, Ordering::Relaxed);
        self.refcnt.store(1, Ordering::Relaxed);
    }

    pub(crate) fn refcnt(&self) -> u32 {
        self.refcnt.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_ref(&self) {
        self.refcnt.fetch_add(1, Ordering::Relaxed);
    }

    /// 减少引用计数，返回减少后的值
    ///
    /// 引用计数为 0 时再减少属于调用方违约，直接 panic。
    pub(crate) fn dec_ref(&self, who: &str) -> u32 {
        let old = self.refcnt.load(Ordering::Relaxed);
        if old == 0 {
            panic!("{}: refcnt underflow", who);
        }
        self.refcnt.store(old - 1, Ordering::Relaxed);
        old - 1
    }

    pub(crate) fn recency(&self) -> Tick {
        self.recency.load(Ordering::Relaxed)
    }

    pub(crate) fn stamp(&self, now: Tick) {
        self.recency.store(now, Ordering::Relaxed);
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn set_valid(&self) {
        self.valid.store(true, Ordering::Release);
    }

    pub(crate) fn bucket(&self) -> usize {
        self.bucket.load(Ordering::Relaxed)
    }

    pub(crate) fn set_bucket(&self, bucket: usize) {
        self.bucket.store(bucket, Ordering::Relaxed);
    }

    pub(crate) fn next(&self) -> SlotId {
        self.next.load(Ordering::Relaxed)
    }

    pub(crate) fn prev(&self) -> SlotId {
        self.prev.load(Ordering::Relaxed)
    }

    pub(crate) fn set_next(&self, id: SlotId) {
        self.next.store(id, Ordering::Relaxed);
    }

    pub(crate) fn set_prev(&self, id: SlotId) {
        self.prev.store(id, Ordering::Relaxed);
    }

    pub(crate) fn info(&self) -> SlotInfo {
        SlotInfo {
            device: self.device.load(Ordering::Relaxed),
            block: self.block.load(Ordering::Relaxed),
            assigned: self.is_assigned(),
            valid: self.is_valid(),
            refcnt: self.refcnt(),
            recency: self.recency(),
            bucket: self.bucket(),
        }
    }
}

impl core::fmt::Debug for Slot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Slot")
            .field("info", &self.info())
            .field("locked", &self.data.is_locked())
            .finish()
    }
}
