//! 分桶块缓存
//!
//! 固定数量的槽位分布在若干个带锁的哈希桶中。初始化时所有槽位都挂在 0 号桶，
//! 之后随着未命中时的回收逐渐迁移到 `blockno % nbucket` 对应的桶。
//!
//! # 查找 / 分配（`get`）
//!
//! 1. 锁住本桶，查找 `(dev, blockno)`，命中则引用计数加一并返回。
//! 2. 未命中：在本桶中找引用计数为 0 且空闲最久的槽位，找到则原地改派。
//! 3. 本桶没有空闲槽位：释放本桶锁，按下标升序扫描其他桶，
//!    始终只保留当前最佳候选所在桶的锁。
//! 4. 重新锁住本桶再查一次，其他线程可能已经缓存了同一个块。
//! 5. 仍未命中且没有候选：槽位耗尽，返回 `NoSpace`。
//! 6. 否则把候选从原桶摘下，插入本桶并改派。
//!
//! # 锁顺序
//!
//! 桶锁只用于链表和元数据的短暂修改，从不跨设备 I/O 或内容锁等待持有。
//! 同时持有两把桶锁时一律按下标升序获取：若候选所在桶的下标大于本桶，
//! 先放掉候选桶锁，锁住本桶完成第 4 步，再锁回候选桶并确认候选仍然空闲；
//! 候选已被他人取走时重新扫描。

use super::bucket::{Bucket, ListHead};
use super::config::CacheConfig;
use super::handle::{Buf, PinnedSlot};
use super::slot::{Slot, SlotId, SlotInfo};
use super::stats::{CacheStats, StatCounters};
use crate::block::{BlockDevice, BlockNo, DeviceId};
use crate::error::{Error, ErrorKind, Result};
use crate::sync::{age, Tick, TickSource};
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::MutexGuard;

/// 回收候选
#[derive(Debug, Clone, Copy)]
struct Victim {
    slot: SlotId,
    /// 扫描时刻下的空闲时长
    age: Tick,
}

/// 分桶块缓存
///
/// 对应 xv6 的 `bcache`。`BufCache` 本身可在线程间共享（`Arc<BufCache<D>>`），
/// 所有操作都以 `&self` 调用。
pub struct BufCache<D: BlockDevice> {
    config: CacheConfig,
    slots: Box<[Slot]>,
    buckets: Box<[Bucket]>,
    device: D,
    clock: Arc<dyn TickSource>,
    stats: StatCounters,
}

impl<D: BlockDevice> BufCache<D> {
    /// 创建块缓存
    ///
    /// 分配 `nbuf` 个槽位和 `nbucket` 个空桶，并把所有槽位放入 0 号桶。
    ///
    /// # 参数
    ///
    /// * `config` - 缓存配置
    /// * `device` - 底层块设备，块大小必须与 `config.block_size` 一致
    /// * `clock` - 逻辑时钟，用于记录槽位空闲时刻
    pub fn new(config: CacheConfig, device: D, clock: Arc<dyn TickSource>) -> Result<Self> {
        config.validate()?;
        if device.block_size() != config.block_size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "device block size does not match cache block size",
            ));
        }

        let slots: Box<[Slot]> = (0..config.nbuf)
            .map(|_| Slot::new(config.block_size))
            .collect();
        let buckets: Box<[Bucket]> = (0..config.nbucket).map(|_| Bucket::new()).collect();

        {
            let mut head = buckets[0].lock();
            for id in 0..slots.len() {
                head.push_front(&slots, id, 0);
            }
        }

        log::debug!(
            "[BCACHE] init: {} slots x {} bytes in {} buckets",
            config.nbuf,
            config.block_size,
            config.nbucket
        );

        Ok(Self {
            config,
            slots,
            buckets,
            device,
            clock,
            stats: StatCounters::default(),
        })
    }

    /// 查找或分配缓存块，返回持有内容锁的句柄以及数据是否有效
    ///
    /// 有效标志为 `false` 时，调用方应自行填充数据（或改用 [`BufCache::read`]）。
    ///
    /// # 错误
    ///
    /// 所有槽位都被引用时返回 `NoSpace`。
    pub fn acquire(&self, dev: DeviceId, blockno: BlockNo) -> Result<(Buf<'_, D>, bool)> {
        let id = self.get(dev, blockno)?;
        let guard = self.slots[id].data.lock();
        let valid = self.slots[id].is_valid();
        Ok((Buf::new(self, id, dev, blockno, guard), valid))
    }

    /// 读取块，返回持有内容锁且数据有效的句柄
    ///
    /// 缓存中没有有效数据时同步从设备读取。设备错误原样返回，
    /// 此时句柄已被释放，槽位保持无效。
    pub fn read(&self, dev: DeviceId, blockno: BlockNo) -> Result<Buf<'_, D>> {
        let (mut buf, valid) = self.acquire(dev, blockno)?;
        if !valid {
            log::debug!("[BCACHE] read dev={} block={} from device", dev, blockno);
            self.device.read_block(dev, blockno, buf.data_mut())?;
            self.stats.device_read();
            self.slots[buf.slot()].set_valid();
        }
        Ok(buf)
    }

    /// 把句柄中的数据写回设备
    ///
    /// # Panics
    ///
    /// 当前线程未持有该槽位的内容锁，或句柄不属于本缓存时 panic。
    pub fn write(&self, buf: &Buf<'_, D>) -> Result<()> {
        if !core::ptr::eq(buf.owner(), self) || !buf.holding() {
            panic!("bwrite: content lock of slot {} not held", buf.slot());
        }
        log::debug!(
            "[BCACHE] write dev={} block={} slot={}",
            buf.device(),
            buf.block(),
            buf.slot()
        );
        self.device.write_block(buf.device(), buf.block(), buf.data())?;
        self.stats.device_write();
        Ok(())
    }

    /// 释放句柄，等价于 `drop(buf)`
    pub fn release(&self, buf: Buf<'_, D>) {
        buf.release();
    }

    /// 钉住句柄对应的槽位
    ///
    /// 引用计数加一，与内容锁无关；在交还给 [`BufCache::unpin`] 之前，
    /// 即使句柄已经释放，槽位也不会被回收。
    pub fn pin(&self, buf: &Buf<'_, D>) -> PinnedSlot<'_, D> {
        let slot = &self.slots[buf.slot()];
        let _head = self.buckets[slot.bucket()].lock();
        slot.inc_ref();
        PinnedSlot {
            cache: self,
            slot: buf.slot(),
            dev: buf.device(),
            blockno: buf.block(),
        }
    }

    /// 解除钉住
    ///
    /// # Panics
    ///
    /// 凭据由其他缓存签发，或槽位引用计数已为 0 时 panic。
    pub fn unpin(&self, pinned: PinnedSlot<'_, D>) {
        if !core::ptr::eq(pinned.cache, self) {
            panic!("bunpin: slot {} was pinned in another cache", pinned.slot);
        }
        self.put(pinned.slot, pinned.dev, pinned.blockno, "bunpin");
    }

    /// 归还一个引用，计数归零时记录空闲时刻
    ///
    /// 引用者持有的块标识必须与槽位一致，否则属于调用方违约。
    pub(crate) fn put(&self, id: SlotId, dev: DeviceId, blockno: BlockNo, who: &str) {
        let slot = &self.slots[id];
        // 引用计数大于 0 的槽位不会迁移，这里读到的桶就是它当前所在的桶
        let bucket = slot.bucket();
        let _head = self.buckets[bucket].lock();
        debug_assert_eq!(slot.bucket(), bucket);
        if !slot.matches(dev, blockno) {
            panic!(
                "{}: slot {} does not hold dev={} block={}",
                who, id, dev, blockno
            );
        }
        if slot.dec_ref(who) == 0 {
            slot.stamp(self.clock.now());
        }
    }

    fn get(&self, dev: DeviceId, blockno: BlockNo) -> Result<SlotId> {
        let home = self.bucket_of(blockno);

        {
            let head = self.buckets[home].lock();

            // 块是否已在缓存中
            if let Some(id) = self.find_cached(&head, dev, blockno) {
                self.slots[id].inc_ref();
                self.stats.lookup(true);
                log::trace!("[BCACHE] get dev={} block={} HIT slot={}", dev, blockno, id);
                return Ok(id);
            }
            self.stats.lookup(false);

            if let Some(victim) = self.oldest_unused(&head, self.clock.now(), None) {
                self.slots[victim.slot].claim(dev, blockno);
                self.stats.local_recycle();
                log::debug!(
                    "[BCACHE] get dev={} block={} MISS, recycled slot={} in bucket {}",
                    dev,
                    blockno,
                    victim.slot,
                    home
                );
                return Ok(victim.slot);
            }
        }

        self.steal(dev, blockno, home)
    }

    /// 本桶没有空闲槽位时，从其他桶迁移一个过来
    fn steal(&self, dev: DeviceId, blockno: BlockNo, home: usize) -> Result<SlotId> {
        loop {
            let (candidate, held) = match self.scan_other_buckets(home) {
                Some((victim, owner, guard)) if owner < home => (Some((victim, owner)), Some(guard)),
                Some((victim, owner, guard)) => {
                    drop(guard);
                    (Some((victim, owner)), None)
                }
                None => (None, None),
            };

            let mut own = self.buckets[home].lock();

            // 扫描期间其他线程可能已经缓存了同一个块
            if let Some(id) = self.find_cached(&own, dev, blockno) {
                self.slots[id].inc_ref();
                self.stats.recheck_hit();
                log::debug!(
                    "[BCACHE] get dev={} block={} cached concurrently in slot={}, candidate abandoned",
                    dev,
                    blockno,
                    id
                );
                return Ok(id);
            }

            let Some((victim, owner)) = candidate else {
                drop(own);
                log::error!(
                    "[BCACHE] get dev={} block={}: no buffers, all {} slots referenced",
                    dev,
                    blockno,
                    self.slots.len()
                );
                return Err(Error::new(ErrorKind::NoSpace, "bget: no buffers"));
            };

            let mut foreign = match held {
                Some(guard) => guard,
                None => self.buckets[owner].lock(),
            };

            let slot = &self.slots[victim.slot];
            if slot.refcnt() != 0 || slot.bucket() != owner {
                log::warn!(
                    "[BCACHE] candidate slot={} taken while relocking bucket {}, rescanning",
                    victim.slot,
                    owner
                );
                continue;
            }

            foreign.unlink(&self.slots, victim.slot);
            own.push_front(&self.slots, victim.slot, home);
            slot.claim(dev, blockno);
            self.stats.global_recycle();
            log::debug!(
                "[BCACHE] get dev={} block={} MISS, moved slot={} from bucket {} to {}",
                dev,
                blockno,
                victim.slot,
                owner,
                home
            );
            return Ok(victim.slot);
        }
    }

    /// 按下标升序扫描除 `home` 以外的桶，返回全局空闲最久的槽位
    ///
    /// 返回时仍持有候选所在桶的锁；落选桶的锁在扫描过程中立即释放。
    fn scan_other_buckets(&self, home: usize) -> Option<(Victim, usize, MutexGuard<'_, ListHead>)> {
        let now = self.clock.now();
        let mut best: Option<(Victim, usize, MutexGuard<'_, ListHead>)> = None;

        for i in (0..self.buckets.len()).filter(|&i| i != home) {
            let head = self.buckets[i].lock();
            let floor = best.as_ref().map(|(victim, _, _)| victim.age);
            let found = self.oldest_unused(&head, now, floor);
            match found {
                // 赋值时旧候选桶的锁随之释放
                Some(victim) => best = Some((victim, i, head)),
                None => drop(head),
            }
        }

        best
    }

    /// 在一个桶里找空闲最久的未引用槽位
    ///
    /// 从最早加入的成员开始扫描，只有空闲时长严格更大才替换当前最佳，
    /// 因此相同时长时先扫描到的槽位胜出。给定 `floor` 时只返回空闲时长超过它的槽位。
    /// 从未分配过的槽位没有时间戳，按最大空闲时长处理。
    fn oldest_unused(&self, head: &ListHead, now: Tick, floor: Option<Tick>) -> Option<Victim> {
        let mut best: Option<Victim> = None;
        for id in head.iter_oldest(&self.slots) {
            let slot = &self.slots[id];
            if slot.refcnt() != 0 {
                continue;
            }
            let idle = if slot.is_assigned() {
                age(now, slot.recency())
            } else {
                Tick::MAX
            };
            let beats = match best.map(|v| v.age).or(floor) {
                Some(current) => idle > current,
                None => true,
            };
            if beats {
                best = Some(Victim { slot: id, age: idle });
            }
        }
        best
    }

    fn find_cached(&self, head: &ListHead, dev: DeviceId, blockno: BlockNo) -> Option<SlotId> {
        head.iter(&self.slots)
            .find(|&id| self.slots[id].matches(dev, blockno))
    }

    /// 块号对应的桶
    pub fn bucket_of(&self, blockno: BlockNo) -> usize {
        (blockno % self.buckets.len() as u64) as usize
    }

    /// 查找块所在槽位，不增加引用计数
    pub fn lookup(&self, dev: DeviceId, blockno: BlockNo) -> Option<SlotId> {
        let head = self.buckets[self.bucket_of(blockno)].lock();
        self.find_cached(&head, dev, blockno)
    }

    /// 槽位元数据快照
    ///
    /// # Panics
    ///
    /// `id` 越界时 panic。
    pub fn slot_info(&self, id: SlotId) -> SlotInfo {
        let slot = &self.slots[id];
        loop {
            let bucket = slot.bucket();
            let _head = self.buckets[bucket].lock();
            // 读取桶号与加锁之间槽位可能迁移
            if slot.bucket() == bucket {
                return slot.info();
            }
        }
    }

    /// 桶内槽位，从最近加入的开始
    ///
    /// # Panics
    ///
    /// `bucket` 越界时 panic。
    pub fn bucket_slots(&self, bucket: usize) -> Vec<SlotId> {
        let head = self.buckets[bucket].lock();
        let ids: Vec<SlotId> = head.iter(&self.slots).collect();
        debug_assert_eq!(ids.len(), head.len());
        ids
    }

    /// 缓存配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 底层设备
    pub fn device(&self) -> &D {
        &self.device
    }

    /// 统计信息
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub(crate) fn slot_ref(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }
}

impl<D: BlockDevice> core::fmt::Debug for BufCache<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufCache")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
