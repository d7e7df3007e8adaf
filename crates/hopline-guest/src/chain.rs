//! # chain 模块说明
//!
//! ## 角色定位（Why）
//! - 阶段代码只关心“修改上下文，然后交给下一阶段”；编码、缓冲交换与错误旁路都收敛到 [`ChainClient`]；
//! - 阶段入口（`run` 导出或进程内宿主）同样经由这里完成“读入、执行、写出”。
//!
//! ## 执行逻辑（How）
//! - `next()`：编码活动上下文 → 桥接交换 → 解码结果并整体替换；
//! - `serve()`：解码入口输入 → 执行阶段函数 → 写出上下文，阶段失败时改写为错误负载；
//! - `run_stage()`：在 `serve()` 之上把输出位置打包为 `u64`，与宿主 ABI 对齐。
//!
//! ## 契约（What）
//! - `next()` 返回 [`ChainError::Upstream`] 时活动上下文保持调用前的内容；
//! - 上游错误消息原样向上游传递，不叠加前缀。

use std::error::Error;
use std::fmt;

use hopline_signature::{Context, ContextError, Request, Response};
use hopline_wire::Encoder;
use tracing::{debug_span, error, warn};

use crate::{BufferBridge, ChainError, RegionPointer, codes};

/// 阶段函数的返回类型；任何错误都会转为发往上游的错误负载。
pub type StageResult = Result<(), Box<dyn Error>>;

/// 链式调用客户端：活动上下文加上一个缓冲桥接。
pub struct ChainClient {
    context: Context,
    bridge: Box<dyn BufferBridge>,
    // 最近一次 `abort` 写出的错误负载位置；之后的任何上下文写出都会清除它。
    aborted: Option<RegionPointer>,
}

impl ChainClient {
    /// 以空上下文创建客户端。
    pub fn new(bridge: Box<dyn BufferBridge>) -> Self {
        Self::with_context(bridge, Context::new())
    }

    /// 以给定上下文创建客户端。
    pub fn with_context(bridge: Box<dyn BufferBridge>, context: Context) -> Self {
        Self {
            context,
            bridge,
            aborted: None,
        }
    }

    /// 活动上下文。
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// 活动上下文（可变）。
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// 活动请求。
    pub fn request(&self) -> &Request {
        self.context.request()
    }

    /// 活动请求（可变）。
    pub fn request_mut(&mut self) -> &mut Request {
        self.context.request_mut()
    }

    /// 活动响应。
    pub fn response(&self) -> &Response {
        self.context.response()
    }

    /// 活动响应（可变）。
    pub fn response_mut(&mut self) -> &mut Response {
        self.context.response_mut()
    }

    /// 底层桥接。
    pub fn bridge(&self) -> &dyn BufferBridge {
        self.bridge.as_ref()
    }

    /// 底层桥接（可变），用于宿主装载入口输入。
    pub fn bridge_mut(&mut self) -> &mut dyn BufferBridge {
        self.bridge.as_mut()
    }

    /// 取出活动上下文。
    pub fn into_context(self) -> Context {
        self.context
    }

    /// 把活动上下文交给下一阶段，并以其输出整体替换活动上下文。
    ///
    /// # 教案式说明
    /// - **前置条件**：桥接已注册下一阶段，否则立即返回 [`BridgeError::Unwired`](crate::BridgeError::Unwired)；
    /// - **后置条件**：
    ///   - 成功时活动上下文等于下游输出，字段级不做合并；
    ///   - 下游返回错误负载时得到 [`ChainError::Upstream`]，活动上下文不变；
    ///   - 返回字节损坏时得到 [`ChainError::Corrupt`]，同样不做部分更新。
    pub fn next(&mut self) -> Result<&mut Context, ChainError> {
        let span = debug_span!("chain.next", strategy = %self.bridge.strategy());
        let _entered = span.enter();

        self.to_write_buffer()?;
        if let Err(err) = self.bridge.exchange() {
            warn!(code = err.code(), error = %err, "next stage did not complete");
            return Err(err.into());
        }
        self.from_read_buffer()?;
        Ok(&mut self.context)
    }

    /// 编码活动上下文到写缓冲，返回其位置。
    ///
    /// 写缓冲以最后一次写出为准：此前 [`abort`](Self::abort) 留下的错误负载会被覆盖并撤销。
    pub fn to_write_buffer(&mut self) -> Result<RegionPointer, ChainError> {
        self.aborted = None;
        self.context
            .encode_into(self.bridge.stage_outgoing())
            .map_err(ChainError::Encode)?;
        Ok(self.bridge.expose()?)
    }

    /// 从读缓冲解码上下文并整体替换活动上下文。
    pub fn from_read_buffer(&mut self) -> Result<(), ChainError> {
        let decoded = Context::decode(&self.bridge.incoming());
        match decoded {
            Ok(context) => {
                self.context = context;
                Ok(())
            }
            Err(ContextError::Upstream(message)) => {
                warn!(code = codes::CHAIN_UPSTREAM, %message, "next stage reported an error");
                Err(ChainError::Upstream(message))
            }
            Err(ContextError::Corrupt(err)) => {
                error!(code = codes::CHAIN_CORRUPT, error = %err, "read buffer is not a context");
                Err(ChainError::Corrupt(err))
            }
        }
    }

    /// 以错误负载覆盖写缓冲，向上游报告本阶段失败。
    ///
    /// 写缓冲中只有错误负载，上游解码时不会得到任何上下文字段。
    ///
    /// 与阶段入口的配合：
    /// - 在 [`serve`](Self::serve) / [`run_stage`](Self::run_stage) 的阶段函数内调用后，
    ///   即使阶段函数随后返回 `Ok(())`，入口也直接交出这份错误负载，不再编码活动上下文；
    /// - 之后再调用 [`next`](Self::next) 或 [`to_write_buffer`](Self::to_write_buffer)
    ///   会重新写出上下文，先前的中止随之失效。
    pub fn abort(&mut self, message: &str) -> Result<RegionPointer, ChainError> {
        self.aborted = None;
        Encoder::new(self.bridge.stage_outgoing())
            .error(message)
            .map_err(ChainError::Encode)?;
        let pointer = self.bridge.expose()?;
        self.aborted = Some(pointer);
        Ok(pointer)
    }

    /// 写缓冲当前是否为 [`abort`](Self::abort) 写出的错误负载。
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// 执行一次阶段入口：读入上下文、运行 `stage`、写出结果。
    ///
    /// 读入失败或 `stage` 返回错误时，写缓冲改为错误负载；只有错误负载也无法写出时才返回 `Err`。
    /// `stage` 内已调用 [`abort`](Self::abort) 且之后未再写出上下文时，原样交出该错误负载。
    pub fn serve<F>(&mut self, stage: F) -> Result<RegionPointer, ChainError>
    where
        F: FnOnce(&mut ChainClient) -> StageResult,
    {
        self.aborted = None;
        let outcome = match self.from_read_buffer() {
            Ok(()) => stage(self),
            Err(err) => Err(err.into()),
        };
        match outcome {
            Ok(()) => match self.aborted.take() {
                Some(pointer) => Ok(pointer),
                None => self.to_write_buffer(),
            },
            Err(err) => {
                let message = failure_message(err.as_ref());
                warn!(error = %message, "stage failed, reporting upstream");
                self.abort(&message)
            }
        }
    }

    /// 与 `run` 导出对齐的阶段入口：返回 `offset << 32 | len`。
    ///
    /// 连错误负载都无法写出时返回 `0`，宿主据此读到空输出并按损坏处理。
    pub fn run_stage<F>(&mut self, stage: F) -> u64
    where
        F: FnOnce(&mut ChainClient) -> StageResult,
    {
        match self.serve(stage) {
            Ok(pointer) => pointer.pack(),
            Err(err) => {
                error!(code = err.code(), error = %err, "stage output could not be written");
                0
            }
        }
    }
}

impl fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClient")
            .field("context", &self.context)
            .field("strategy", &self.bridge.strategy())
            .field("aborted", &self.aborted)
            .finish()
    }
}

/// 上游错误消息原样传递，其余错误取其展示文本。
fn failure_message(err: &(dyn Error + 'static)) -> String {
    match err.downcast_ref::<ChainError>() {
        Some(ChainError::Upstream(message)) => message.clone(),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use hopline_wire::{Decoder, WireError};

    use super::*;
    use crate::{BridgeError, DirectArrayBridge};

    fn echo_client() -> ChainClient {
        ChainClient::new(Box::new(DirectArrayBridge::with_next(|bytes| {
            Ok(bytes.to_vec())
        })))
    }

    #[test]
    fn abort_writes_only_an_error_payload() {
        let mut client = echo_client();
        client.request_mut().set_uri("/secret");
        let pointer = client.abort("denied").expect("abort");
        assert_eq!(pointer.len as usize, client.bridge().outgoing().len());

        let mut decoder = Decoder::new(client.bridge().outgoing());
        assert_eq!(decoder.error(), Ok(Some("denied".to_owned())));
        assert!(decoder.is_empty());
    }

    #[test]
    fn upstream_message_is_forwarded_verbatim() {
        let err: Box<dyn Error> = Box::new(ChainError::Upstream("next error".to_owned()));
        assert_eq!(failure_message(err.as_ref()), "next error");
        let err: Box<dyn Error> = Box::new(BridgeError::Unwired);
        assert_eq!(
            failure_message(err.as_ref()),
            BridgeError::Unwired.to_string()
        );
    }

    #[test]
    fn corrupt_read_buffer_keeps_context() {
        let mut client = echo_client();
        client.request_mut().set_method("PUT");
        client
            .bridge_mut()
            .load_incoming(&[0x05, 0x00])
            .expect("load");
        assert!(matches!(
            client.from_read_buffer(),
            Err(ChainError::Corrupt(WireError::Truncated { .. }))
        ));
        assert_eq!(client.request().method(), "PUT");
    }

    #[test]
    fn stage_error_becomes_error_payload() {
        let mut client = echo_client();
        let input = Context::new().to_bytes().expect("encode");
        client.bridge_mut().load_incoming(&input).expect("load");

        let pointer = client
            .serve(|_| Err("refused by policy".into()))
            .expect("serve");
        assert_eq!(pointer.len as usize, client.bridge().outgoing().len());
        assert_eq!(
            Context::decode(client.bridge().outgoing()),
            Err(ContextError::Upstream("refused by policy".to_owned()))
        );
    }

    #[test]
    fn abort_inside_stage_survives_ok_return() {
        let mut client = echo_client();
        let input = Context::new().to_bytes().expect("encode");
        client.bridge_mut().load_incoming(&input).expect("load");

        let pointer = client
            .serve(|client| {
                client.request_mut().set_uri("/leak");
                client.abort("blocked")?;
                Ok(())
            })
            .expect("serve");
        assert!(!client.is_aborted());
        assert_eq!(pointer.len as usize, client.bridge().outgoing().len());
        assert_eq!(
            Context::decode(client.bridge().outgoing()),
            Err(ContextError::Upstream("blocked".to_owned()))
        );
    }

    #[test]
    fn later_write_cancels_abort() {
        let mut client = echo_client();
        let input = Context::new().to_bytes().expect("encode");
        client.bridge_mut().load_incoming(&input).expect("load");

        client
            .serve(|client| {
                client.abort("changed my mind")?;
                client.request_mut().set_uri("/ok");
                client.next()?;
                Ok(())
            })
            .expect("serve");
        let output = Context::decode(client.bridge().outgoing()).expect("context");
        assert_eq!(output.request().uri(), "/ok");
    }
}
