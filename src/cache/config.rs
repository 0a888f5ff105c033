//! 块缓存配置

use crate::consts::{BSIZE, NBUCKET, NBUF};
use crate::error::{Error, ErrorKind, Result};

/// 块缓存配置
///
/// 初始化时固定，缓存生命周期内不可调整。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 缓存槽位总数
    pub nbuf: usize,
    /// 哈希桶数量
    pub nbucket: usize,
    /// 块大小（字节）
    pub block_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            nbuf: NBUF,
            nbucket: NBUCKET,
            block_size: BSIZE,
        }
    }
}

impl CacheConfig {
    /// 创建配置
    pub const fn new(nbuf: usize, nbucket: usize, block_size: usize) -> Self {
        Self {
            nbuf,
            nbucket,
            block_size,
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.nbuf == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "nbuf must be non-zero"));
        }
        if self.nbucket == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "nbucket must be non-zero"));
        }
        if self.block_size == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "block_size must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.nbuf, 30);
        assert_eq!(config.nbucket, 13);
        assert_eq!(config.block_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero() {
        for config in [
            CacheConfig::new(0, 13, 1024),
            CacheConfig::new(30, 0, 1024),
            CacheConfig::new(30, 13, 0),
        ] {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }
}
