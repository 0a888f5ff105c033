//! 内存块设备
//!
//! 用 `BTreeMap` 保存已写入的块，未写过的块读出全零。

use super::{BlockDevice, BlockNo, DeviceId};
use crate::error::{Error, ErrorKind, Result};
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

/// 内存块设备
///
/// 每个设备号拥有 `total_blocks` 个块，统计物理读写次数。
pub struct MemDisk {
    block_size: usize,
    total_blocks: u64,
    storage: Mutex<BTreeMap<(DeviceId, BlockNo), Vec<u8>>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemDisk {
    /// 创建内存块设备
    ///
    /// # 参数
    ///
    /// * `block_size` - 块大小（字节）
    /// * `total_blocks` - 每个设备号的块数
    pub fn new(block_size: usize, total_blocks: u64) -> Self {
        Self {
            block_size,
            total_blocks,
            storage: Mutex::new(BTreeMap::new()),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// 物理读取次数
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// 物理写入次数
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// 直接写入块内容（绕过计数），用于准备初始数据
    pub fn fill(&self, dev: DeviceId, blockno: BlockNo, data: &[u8]) -> Result<()> {
        self.check(blockno, data.len())?;
        self.storage.lock().insert((dev, blockno), data.to_vec());
        Ok(())
    }

    /// 直接读取块内容（绕过计数），用于校验
    pub fn snapshot(&self, dev: DeviceId, blockno: BlockNo) -> Vec<u8> {
        self.storage
            .lock()
            .get(&(dev, blockno))
            .cloned()
            .unwrap_or_else(|| vec![0u8; self.block_size])
    }

    fn check(&self, blockno: BlockNo, len: usize) -> Result<()> {
        if blockno >= self.total_blocks {
            return Err(Error::new(ErrorKind::InvalidInput, "block number out of range"));
        }
        if len != self.block_size {
            return Err(Error::new(ErrorKind::InvalidInput, "buffer size does not match block size"));
        }
        Ok(())
    }
}

impl BlockDevice for MemDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read_block(&self, dev: DeviceId, blockno: BlockNo, buf: &mut [u8]) -> Result<()> {
        self.check(blockno, buf.len())?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.storage.lock().get(&(dev, blockno)) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_block(&self, dev: DeviceId, blockno: BlockNo, buf: &[u8]) -> Result<()> {
        self.check(blockno, buf.len())?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.storage.lock().insert((dev, blockno), buf.to_vec());
        Ok(())
    }
}

impl core::fmt::Debug for MemDisk {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemDisk")
            .field("block_size", &self.block_size)
            .field("total_blocks", &self.total_blocks)
            .field("reads", &self.read_count())
            .field("writes", &self.write_count())
            .finish()
    }
}
