//! 宿主侧的上下文读写入口。
//!
//! # 模块定位（Why）
//! - 宿主（或进程内的下一阶段）只关心“把字节变成上下文”与“把上下文变回字节”，
//!   不参与指针交换；
//! - 读取时必须先判定错误标签，命中即整体失败，不做部分解释。
//!
//! # 契约说明（What）
//! - [`RuntimeContext::read`] 成功时整体替换内部上下文；失败时内部上下文保持不变；
//! - [`RuntimeContext::write`] 与 [`RuntimeContext::error`] 复用内部缓冲，返回的 `Bytes` 与缓冲脱钩，可长期持有。

use bytes::{Bytes, BytesMut};
use hopline_wire::{Encoder, WireError};
use tracing::{debug, warn};

use crate::{Context, ContextError};

/// 宿主持有的上下文及其编码缓冲。
#[derive(Debug, Default)]
pub struct RuntimeContext {
    context: Context,
    buffer: BytesMut,
}

impl RuntimeContext {
    /// 以空上下文创建。
    pub fn new() -> Self {
        Self::default()
    }

    /// 包装既有上下文。
    pub fn with_context(context: Context) -> Self {
        Self {
            context,
            buffer: BytesMut::new(),
        }
    }

    /// 当前上下文。
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// 当前上下文的可变视图。
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// 取出上下文。
    pub fn into_context(self) -> Context {
        self.context
    }

    /// 从阶段输出读取上下文并整体替换。
    pub fn read(&mut self, src: &[u8]) -> Result<(), ContextError> {
        match Context::decode(src) {
            Ok(context) => {
                self.context = context;
                Ok(())
            }
            Err(err) => {
                warn!(code = err.code(), error = %err, "stage output rejected");
                Err(err)
            }
        }
    }

    /// 编码当前上下文。
    pub fn write(&mut self) -> Result<Bytes, WireError> {
        self.buffer.clear();
        self.context.encode_into(&mut self.buffer)?;
        Ok(self.buffer.split().freeze())
    }

    /// 编码仅包含错误负载的输出，用于中止整条流水线。
    pub fn error(&mut self, message: &str) -> Result<Bytes, WireError> {
        self.buffer.clear();
        Encoder::new(&mut self.buffer).error(message)?;
        debug!(bytes = self.buffer.len(), "encoded error payload");
        Ok(self.buffer.split().freeze())
    }
}
