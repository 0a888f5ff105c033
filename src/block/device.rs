//! 块设备协作者接口

use crate::error::Result;

/// 设备号
pub type DeviceId = u32;

/// 块号
pub type BlockNo = u64;

/// 块设备接口
///
/// 实现此 trait 以提供底层块设备访问。缓存只在持有槽位内容锁时调用
/// `read_block`/`write_block`，不同槽位的 I/O 可能来自不同线程并发执行，
/// 因此接口以 `&self` 调用，由实现自行负责内部同步。
///
/// # 示例
///
/// ```rust,ignore
/// use bcache_core::{BlockDevice, BlockNo, DeviceId, Result};
///
/// struct VirtioDisk {
///     // ...
/// }
///
/// impl BlockDevice for VirtioDisk {
///     fn block_size(&self) -> usize {
///         1024
///     }
///
///     fn read_block(&self, dev: DeviceId, blockno: BlockNo, buf: &mut [u8]) -> Result<()> {
///         // 提交读请求并等待完成
///         Ok(())
///     }
///
///     fn write_block(&self, dev: DeviceId, blockno: BlockNo, buf: &[u8]) -> Result<()> {
///         // 提交写请求并等待完成
///         Ok(())
///     }
/// }
/// ```
pub trait BlockDevice: Send + Sync {
    /// 块大小（字节），必须与缓存配置的 `block_size` 一致
    fn block_size(&self) -> usize;

    /// 同步读取一个块
    ///
    /// # 参数
    ///
    /// * `dev` - 设备号
    /// * `blockno` - 块号
    /// * `buf` - 目标缓冲区（长度为 `block_size`）
    fn read_block(&self, dev: DeviceId, blockno: BlockNo, buf: &mut [u8]) -> Result<()>;

    /// 同步写入一个块
    ///
    /// # 参数
    ///
    /// * `dev` - 设备号
    /// * `blockno` - 块号
    /// * `buf` - 源缓冲区（长度为 `block_size`）
    fn write_block(&self, dev: DeviceId, blockno: BlockNo, buf: &[u8]) -> Result<()>;
}
