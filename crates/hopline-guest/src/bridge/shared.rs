use std::fmt;

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::{BridgeError, codes};

use super::{BridgeStrategy, BufferBridge, Incoming, ReadBuffer, address_of, narrow};

/// 宿主在一次 `next` 调用期间看到的守护模块内存。
///
/// # 契约 (What)
/// - `read` 只能读取本次调用交出的写缓冲；
/// - `resize` 等价于守护模块导出的 `resize`，返回恰有 `len` 字节的写入位置；
/// - `write` 只能写入最近一次 `resize` 返回的区域。
pub trait GuestMemory {
    /// 读取 `[offset, offset + len)`。
    fn read(&self, offset: u32, len: u32) -> Result<&[u8], BridgeError>;

    /// 调整读缓冲并返回其偏移。
    fn resize(&mut self, len: u32) -> u32;

    /// 在 `offset` 处写入结果。
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), BridgeError>;
}

/// 共享内存策略下宿主一侧的 `next` 导入。
///
/// # 教案式说明
/// - **意图 (Why)**：宿主只认线性内存偏移；它先读出待发送上下文，运行下游整条链，
///   再回调 `resize` 并把结果写回守护模块；
/// - **契约 (What)**：返回 `Ok(())` 前必须恰好调用一次 `resize` 并写入结果；
///   未注册下游时返回 [`BridgeError::Unwired`]。
pub trait HostLink {
    /// 切片在宿主地址空间中的偏移。
    fn address_of(&self, bytes: &[u8]) -> u32 {
        address_of(bytes)
    }

    /// 调用下一阶段。
    fn next(
        &mut self,
        offset: u32,
        len: u32,
        memory: &mut dyn GuestMemory,
    ) -> Result<(), BridgeError>;
}

/// 共享内存桥接。
///
/// # 教案式说明
/// - **执行 (How)**：
///   1. 为读缓冲取得 [`ExchangeLease`](super::ExchangeLease)，重入调用直接失败；
///   2. 把写缓冲的偏移与长度交给 [`HostLink::next`]；
///   3. 宿主返回后确认读缓冲在本次调用中被 `resize` 过，否则拒绝解码旧内容。
/// - **契约 (What)**：读缓冲可以与宿主回调共享（见 [`ReadBuffer`]），写缓冲归本实例独占。
pub struct SharedMemoryBridge {
    link: Box<dyn HostLink>,
    outgoing: BytesMut,
    read: ReadBuffer,
}

impl SharedMemoryBridge {
    /// 以宿主链路与读缓冲创建桥接。
    pub fn new(link: Box<dyn HostLink>, read: ReadBuffer) -> Self {
        Self::with_capacity(link, read, 0)
    }

    /// 预留写缓冲容量。
    pub fn with_capacity(link: Box<dyn HostLink>, read: ReadBuffer, capacity: usize) -> Self {
        Self {
            link,
            outgoing: BytesMut::with_capacity(capacity),
            read,
        }
    }

    /// 共享的读缓冲句柄。
    pub fn read_buffer(&self) -> &ReadBuffer {
        &self.read
    }
}

impl fmt::Debug for SharedMemoryBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMemoryBridge")
            .field("outgoing", &self.outgoing.len())
            .field("read", &self.read)
            .finish_non_exhaustive()
    }
}

impl BufferBridge for SharedMemoryBridge {
    fn strategy(&self) -> BridgeStrategy {
        BridgeStrategy::SharedMemory
    }

    fn stage_outgoing(&mut self) -> &mut BytesMut {
        self.outgoing.clear();
        &mut self.outgoing
    }

    fn outgoing(&self) -> &[u8] {
        &self.outgoing
    }

    fn exchange(&mut self) -> Result<(), BridgeError> {
        let lease = self.read.lease()?;
        let offset = self.link.address_of(&self.outgoing);
        let len = narrow(self.outgoing.len())?;
        debug!(offset, len, "handing context to host");

        let mut memory = InstanceMemory {
            outgoing: &self.outgoing,
            outgoing_offset: offset,
            read: &self.read,
        };
        self.link.next(offset, len, &mut memory)?;

        if !lease.resized() {
            warn!(
                code = codes::BRIDGE_NOT_RESIZED,
                "host returned without writing a result"
            );
            return Err(BridgeError::NotResized);
        }
        Ok(())
    }

    fn incoming(&self) -> Incoming<'_> {
        Incoming::Region(self.read.region())
    }

    fn load_incoming(&mut self, bytes: &[u8]) -> Result<(), BridgeError> {
        let offset = self.read.resize(narrow(bytes.len())?);
        self.read.write_at(offset, bytes)
    }
}

struct InstanceMemory<'a> {
    outgoing: &'a [u8],
    outgoing_offset: u32,
    read: &'a ReadBuffer,
}

impl GuestMemory for InstanceMemory<'_> {
    fn read(&self, offset: u32, len: u32) -> Result<&[u8], BridgeError> {
        let len = len as usize;
        if offset != self.outgoing_offset || len > self.outgoing.len() {
            return Err(BridgeError::OutOfBounds { offset, len });
        }
        Ok(&self.outgoing[..len])
    }

    fn resize(&mut self, len: u32) -> u32 {
        self.read.resize(len)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), BridgeError> {
        self.read.write_at(offset, bytes)
    }
}
