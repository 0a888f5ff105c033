//! 缓存统计信息

use core::sync::atomic::{AtomicU64, Ordering};

/// 缓存统计信息快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 总查找次数
    pub lookups: u64,
    /// 在本桶命中的次数
    pub hits: u64,
    /// 未命中次数
    pub misses: u64,
    /// 在本桶回收槽位的次数
    pub local_recycles: u64,
    /// 从其他桶迁移槽位的次数
    pub global_recycles: u64,
    /// 全局扫描后重新检查本桶时命中的次数
    pub recheck_hits: u64,
    /// 设备读取次数
    pub device_reads: u64,
    /// 设备写入次数
    pub device_writes: u64,
}

impl CacheStats {
    /// 计算命中率（重新检查时命中也计入命中）
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            (self.hits + self.recheck_hits) as f64 / self.lookups as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    local_recycles: AtomicU64,
    global_recycles: AtomicU64,
    recheck_hits: AtomicU64,
    device_reads: AtomicU64,
    device_writes: AtomicU64,
}

impl StatCounters {
    pub(crate) fn lookup(&self, hit: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn local_recycle(&self) {
        self.local_recycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn global_recycle(&self) {
        self.global_recycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn recheck_hit(&self) {
        self.recheck_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn device_read(&self) {
        self.device_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn device_write(&self) {
        self.device_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            local_recycles: self.local_recycles.load(Ordering::Relaxed),
            global_recycles: self.global_recycles.load(Ordering::Relaxed),
            recheck_hits: self.recheck_hits.load(Ordering::Relaxed),
            device_reads: self.device_reads.load(Ordering::Relaxed),
            device_writes: self.device_writes.load(Ordering::Relaxed),
        }
    }
}
