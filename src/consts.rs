//! 块缓存常量定义

//=============================================================================
// 默认配置
//=============================================================================

/// 默认缓存槽位数量
pub const NBUF: usize = 30;

/// 默认哈希桶数量（取素数以分散相邻块号）
pub const NBUCKET: usize = 13;

/// 默认块大小（字节）
pub const BSIZE: usize = 1024;

//=============================================================================
// 内部常量
//=============================================================================

/// 桶链表哨兵索引
///
/// 槽位的 `next`/`prev` 指向该值时表示指向所在桶的表头。
pub(crate) const HEAD: usize = usize::MAX;
