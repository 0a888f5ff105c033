//! 块设备抽象
//!
//! block/device.rs 定义缓存依赖的块设备接口（协作者），缓存只通过它进行同步读写。
//! block/mem.rs 提供一个基于内存的实现，供测试和上层嵌入使用。

mod device;
mod mem;

pub use device::{BlockDevice, BlockNo, DeviceId};
pub use mem::MemDisk;
