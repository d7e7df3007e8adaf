use std::cell::{Ref, RefCell};
use std::ops::Deref;
use std::rc::Rc;

use tracing::trace;

use crate::BridgeError;

use super::address_of;

/// 一段由守护模块持有、允许宿主写入的连续内存。
///
/// `resize` 之后长度恰好等于请求值，新增部分以零填充，
/// 因此较短的结果不会残留上一次较长结果的尾部。
#[derive(Debug, Default)]
pub struct BufferRegion {
    data: Vec<u8>,
    generation: u64,
    leased: bool,
}

impl BufferRegion {
    /// 当前内容。
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// 当前长度。
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 在宿主地址空间中的偏移。
    pub fn offset(&self) -> u32 {
        address_of(&self.data)
    }

    /// 每次 `resize` 递增的代数，用于判断宿主是否真正写入了新结果。
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn resize(&mut self, len: usize) -> u32 {
        self.data.clear();
        self.data.resize(len, 0);
        self.generation = self.generation.wrapping_add(1);
        self.offset()
    }

    fn write_at(&mut self, offset: u32, bytes: &[u8]) -> Result<(), BridgeError> {
        if offset != self.offset() || bytes.len() > self.data.len() {
            return Err(BridgeError::OutOfBounds {
                offset,
                len: bytes.len(),
            });
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// 守护模块的读缓冲句柄。
///
/// # 教案式说明
/// - **意图 (Why)**：共享内存策略下，宿主在 `next` 返回前回调导出的 `resize`，
///   该回调与桥接实例必须看到同一块缓冲；句柄克隆共享同一区域；
/// - **契约 (What)**：
///   - `resize(len)` 返回的偏移处恰有 `len` 个可写字节；
///   - `write_at` 只接受最近一次 `resize` 返回的偏移，越界写入被拒绝；
///   - 同一时刻只允许一个 [`ExchangeLease`] 存活。
#[derive(Clone, Debug, Default)]
pub struct ReadBuffer {
    region: Rc<RefCell<BufferRegion>>,
}

impl ReadBuffer {
    /// 创建空的读缓冲。
    pub fn new() -> Self {
        Self::default()
    }

    /// 把缓冲调整为恰好 `len` 字节并返回其偏移。
    pub fn resize(&self, len: u32) -> u32 {
        let offset = self.region.borrow_mut().resize(len as usize);
        trace!(len, offset, "read buffer resized");
        offset
    }

    /// 按宿主语义在 `offset` 处写入 `bytes`。
    pub fn write_at(&self, offset: u32, bytes: &[u8]) -> Result<(), BridgeError> {
        self.region.borrow_mut().write_at(offset, bytes)
    }

    /// 借出当前内容。
    pub fn region(&self) -> Ref<'_, BufferRegion> {
        self.region.borrow()
    }

    /// 为一次链式调用占用缓冲。
    pub fn lease(&self) -> Result<ExchangeLease, BridgeError> {
        let mut region = self.region.borrow_mut();
        if region.leased {
            return Err(BridgeError::Reentrant);
        }
        region.leased = true;
        Ok(ExchangeLease {
            region: Rc::clone(&self.region),
            generation: region.generation,
        })
    }
}

/// 一次链式调用期间对读缓冲的独占租约，释放时自动解除占用。
#[derive(Debug)]
pub struct ExchangeLease {
    region: Rc<RefCell<BufferRegion>>,
    generation: u64,
}

impl ExchangeLease {
    /// 宿主在租约期间是否调用过 `resize`。
    pub fn resized(&self) -> bool {
        self.region.borrow().generation != self.generation
    }
}

impl Drop for ExchangeLease {
    fn drop(&mut self) {
        self.region.borrow_mut().leased = false;
    }
}

/// 读缓冲视图：直传策略借出切片，共享内存策略借出区域。
#[derive(Debug)]
pub enum Incoming<'a> {
    /// 桥接实例直接持有的字节。
    Borrowed(&'a [u8]),
    /// 共享读缓冲中的字节。
    Region(Ref<'a, BufferRegion>),
}

impl Deref for Incoming<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Incoming::Borrowed(bytes) => bytes,
            Incoming::Region(region) => region.as_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_zero_fills_and_drops_stale_tail() {
        let buffer = ReadBuffer::new();
        let offset = buffer.resize(8);
        buffer.write_at(offset, &[9; 8]).expect("write");

        let offset = buffer.resize(3);
        buffer.write_at(offset, &[1, 2]).expect("write");
        assert_eq!(buffer.region().as_slice(), &[1, 2, 0]);
    }

    #[test]
    fn write_outside_region_is_rejected() {
        let buffer = ReadBuffer::new();
        let offset = buffer.resize(4);
        assert_eq!(
            buffer.write_at(offset, &[0; 5]),
            Err(BridgeError::OutOfBounds { offset, len: 5 })
        );
        let wrong = offset.wrapping_add(1);
        assert_eq!(
            buffer.write_at(wrong, &[0; 1]),
            Err(BridgeError::OutOfBounds { offset: wrong, len: 1 })
        );
    }

    #[test]
    fn lease_is_exclusive_until_dropped() {
        let buffer = ReadBuffer::new();
        let shared = buffer.clone();
        let lease = buffer.lease().expect("first lease");
        assert_eq!(shared.lease().err(), Some(BridgeError::Reentrant));
        assert!(!lease.resized());
        shared.resize(2);
        assert!(lease.resized());
        drop(lease);
        assert!(shared.lease().is_ok());
    }
}
