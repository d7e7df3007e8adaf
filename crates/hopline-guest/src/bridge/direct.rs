use std::fmt;

use bytes::BytesMut;
use tracing::{debug, error};

use crate::{BridgeError, codes};

use super::{BridgeStrategy, BufferBridge, Incoming};

/// 直传策略下的下一阶段：接收编码后的上下文，返回下一阶段的完整输出。
pub type NextFn = Box<dyn FnMut(&[u8]) -> Result<Vec<u8>, BridgeError>>;

/// 直传数组桥接。
///
/// # 教案式说明
/// - **意图 (Why)**：宿主运行时能够直接在调用间传递字节数组时，不需要偏移与回写协议；
/// - **执行 (How)**：下一阶段以 [`NextFn`] 注册；`exchange` 把写缓冲整体交出，返回值直接成为读缓冲；
/// - **契约 (What)**：未注册时 `exchange` 返回 [`BridgeError::Unwired`] 并记录错误日志。
pub struct DirectArrayBridge {
    next: Option<NextFn>,
    outgoing: BytesMut,
    incoming: Vec<u8>,
}

impl DirectArrayBridge {
    /// 创建尚未注册下一阶段的桥接。
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// 预留写缓冲容量。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next: None,
            outgoing: BytesMut::with_capacity(capacity),
            incoming: Vec::new(),
        }
    }

    /// 以下一阶段创建桥接。
    pub fn with_next(next: impl FnMut(&[u8]) -> Result<Vec<u8>, BridgeError> + 'static) -> Self {
        let mut bridge = Self::new();
        bridge.register(Box::new(next));
        bridge
    }

    /// 注册或替换下一阶段。
    pub fn register(&mut self, next: NextFn) {
        self.next = Some(next);
    }

    /// 是否已注册下一阶段。
    pub fn is_wired(&self) -> bool {
        self.next.is_some()
    }
}

impl Default for DirectArrayBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DirectArrayBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectArrayBridge")
            .field("wired", &self.is_wired())
            .field("outgoing", &self.outgoing.len())
            .field("incoming", &self.incoming.len())
            .finish()
    }
}

impl BufferBridge for DirectArrayBridge {
    fn strategy(&self) -> BridgeStrategy {
        BridgeStrategy::DirectArray
    }

    fn stage_outgoing(&mut self) -> &mut BytesMut {
        self.outgoing.clear();
        &mut self.outgoing
    }

    fn outgoing(&self) -> &[u8] {
        &self.outgoing
    }

    fn exchange(&mut self) -> Result<(), BridgeError> {
        let Some(next) = self.next.as_mut() else {
            error!(
                code = codes::BRIDGE_UNWIRED,
                strategy = %BridgeStrategy::DirectArray,
                "next stage invoked but none is registered"
            );
            return Err(BridgeError::Unwired);
        };
        debug!(len = self.outgoing.len(), "handing context to next stage");
        self.incoming = next(&self.outgoing)?;
        Ok(())
    }

    fn incoming(&self) -> Incoming<'_> {
        Incoming::Borrowed(&self.incoming)
    }

    fn load_incoming(&mut self, bytes: &[u8]) -> Result<(), BridgeError> {
        self.incoming.clear();
        self.incoming.extend_from_slice(bytes);
        Ok(())
    }
}
