//! # host 模块说明
//!
//! ## 角色定位（Why）
//! - 在同一进程内串联多个阶段，复现宿主按顺序调用各模块、并在 `next` 中递归进入下一模块的行为；
//! - [`LoopbackHost`] 按共享内存协议逐步执行“读出、运行下游、resize、写回”，用于验证守护端的缓冲约定。
//!
//! ## 执行逻辑（How）
//! - [`InProcessPipeline::run`] 编码初始上下文，交给第一阶段；
//! - 每个阶段拥有独立的 [`ChainClient`]，其桥接的下一阶段闭包递归调用后一阶段；
//! - 末端阶段不注册下一阶段，在其中调用 `next()` 会立即失败。

use std::fmt;
use std::rc::Rc;

use hopline_signature::{Context, RuntimeContext};
use tracing::{debug, error, info_span};

use crate::bridge::narrow;
use crate::{
    BridgeError, BridgeStrategy, BufferBridge, ChainClient, ChainError, DirectArrayBridge,
    GuestMemory, HostLink, PipelineError, ReadBuffer, SharedMemoryBridge, StageResult, codes,
};

/// 进程内下游：接收编码后的上下文，返回下游整条链的输出。
pub type Downstream = Box<dyn FnMut(&[u8]) -> Result<Vec<u8>, BridgeError>>;

/// 按共享内存协议模拟宿主 `next` 导入的链路。
pub struct LoopbackHost {
    downstream: Option<Downstream>,
}

impl LoopbackHost {
    /// 以下游创建链路。
    pub fn new(downstream: impl FnMut(&[u8]) -> Result<Vec<u8>, BridgeError> + 'static) -> Self {
        Self {
            downstream: Some(Box::new(downstream)),
        }
    }

    /// 没有下游的链路，对应末端阶段。
    pub fn unwired() -> Self {
        Self { downstream: None }
    }
}

impl fmt::Debug for LoopbackHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackHost")
            .field("wired", &self.downstream.is_some())
            .finish()
    }
}

impl HostLink for LoopbackHost {
    fn next(
        &mut self,
        offset: u32,
        len: u32,
        memory: &mut dyn GuestMemory,
    ) -> Result<(), BridgeError> {
        let Some(downstream) = self.downstream.as_mut() else {
            error!(
                code = codes::BRIDGE_UNWIRED,
                strategy = %BridgeStrategy::SharedMemory,
                "next stage invoked but none is registered"
            );
            return Err(BridgeError::Unwired);
        };
        let request = memory.read(offset, len)?.to_vec();
        let result = downstream(&request)?;
        let target = memory.resize(narrow(result.len())?);
        memory.write(target, &result)
    }
}

type StageFn = Rc<dyn Fn(&mut ChainClient) -> StageResult>;

/// 进程内流水线。
///
/// # 教案式说明
/// - **意图 (Why)**：不依赖 WebAssembly 运行时即可验证多阶段的上下文传播与错误旁路；
/// - **契约 (What)**：
///   - 阶段按注册顺序执行，阶段 `i` 的 `next()` 同步运行阶段 `i + 1..` 整条后缀；
///   - 任一阶段中止时，错误负载逐级向上游传递，`run` 返回
///     [`PipelineError::Context`] 包裹的 `ContextError::Upstream`；
///   - 驱动第一阶段时的桥接故障以 [`PipelineError::Bridge`] 返回，保留 `bridge.*` 错误码。
#[derive(Clone, Default)]
pub struct InProcessPipeline {
    stages: Vec<StageFn>,
    strategy: BridgeStrategy,
}

impl InProcessPipeline {
    /// 创建空流水线，默认使用共享内存协议。
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定各阶段使用的桥接策略。
    pub fn with_strategy(mut self, strategy: BridgeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// 追加一个阶段。
    pub fn stage(mut self, stage: impl Fn(&mut ChainClient) -> StageResult + 'static) -> Self {
        self.stages.push(Rc::new(stage));
        self
    }

    /// 阶段数量。
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// 是否没有任何阶段。
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// 以 `context` 为输入运行整条流水线。
    ///
    /// 没有阶段时原样返回输入。
    pub fn run(&self, context: Context) -> Result<Context, PipelineError> {
        let span = info_span!("pipeline.run", stages = self.stages.len(), strategy = %self.strategy);
        let _entered = span.enter();

        let mut runtime = RuntimeContext::with_context(context);
        if self.stages.is_empty() {
            return Ok(runtime.into_context());
        }
        let input = runtime.write().map_err(PipelineError::Encode)?;
        let stages: Rc<[StageFn]> = self.stages.clone().into();
        let output = invoke(&stages, 0, self.strategy, &input)?;
        runtime.read(&output)?;
        Ok(runtime.into_context())
    }
}

impl fmt::Debug for InProcessPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessPipeline")
            .field("stages", &self.stages.len())
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// 运行阶段 `index`，返回其写缓冲内容。
fn invoke(
    stages: &Rc<[StageFn]>,
    index: usize,
    strategy: BridgeStrategy,
    input: &[u8],
) -> Result<Vec<u8>, BridgeError> {
    let stage = Rc::clone(&stages[index]);
    let mut client = ChainClient::new(bridge_for(stages, index + 1, strategy));
    client.bridge_mut().load_incoming(input)?;
    debug!(stage = index, bytes = input.len(), "entering stage");

    client.serve(|ctx| (*stage)(ctx)).map_err(into_bridge_error)?;
    Ok(client.bridge().outgoing().to_vec())
}

/// 桥接错误原样保留，其余链式错误归为宿主失败。
fn into_bridge_error(err: ChainError) -> BridgeError {
    match err {
        ChainError::Bridge(err) => err,
        other => BridgeError::Host(other.to_string()),
    }
}

/// 为调用阶段 `downstream - 1` 构造桥接；越过末端时不注册下一阶段。
fn bridge_for(
    stages: &Rc<[StageFn]>,
    downstream: usize,
    strategy: BridgeStrategy,
) -> Box<dyn BufferBridge> {
    let wired = downstream < stages.len();
    let stages = Rc::clone(stages);
    let call = move |bytes: &[u8]| invoke(&stages, downstream, strategy, bytes);
    match (strategy, wired) {
        (BridgeStrategy::DirectArray, true) => Box::new(DirectArrayBridge::with_next(call)),
        (BridgeStrategy::DirectArray, false) => Box::new(DirectArrayBridge::new()),
        (BridgeStrategy::SharedMemory, true) => Box::new(SharedMemoryBridge::new(
            Box::new(LoopbackHost::new(call)),
            ReadBuffer::new(),
        )),
        (BridgeStrategy::SharedMemory, false) => Box::new(SharedMemoryBridge::new(
            Box::new(LoopbackHost::unwired()),
            ReadBuffer::new(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pipeline_returns_input() {
        let mut ctx = Context::new();
        ctx.request_mut().set_uri("/same");
        assert_eq!(InProcessPipeline::new().run(ctx.clone()), Ok(ctx));
    }

    #[test]
    fn serve_failures_keep_bridge_codes() {
        let err = into_bridge_error(ChainError::Bridge(BridgeError::TooLarge(1 << 33)));
        assert_eq!(err.code(), codes::BRIDGE_TOO_LARGE);
        assert_eq!(PipelineError::from(err).code(), codes::BRIDGE_TOO_LARGE);

        let err = into_bridge_error(ChainError::Upstream("late".to_owned()));
        assert_eq!(err, BridgeError::Host("upstream stage failed: late".to_owned()));
    }

    #[test]
    fn stage_abort_surfaces_as_context_error() {
        let err = InProcessPipeline::new()
            .stage(|client| {
                client.abort("quota exceeded")?;
                Ok(())
            })
            .run(Context::new())
            .expect_err("stage aborted");
        assert_eq!(err.code(), hopline_signature::codes::UPSTREAM);
    }

    #[test]
    fn unwired_loopback_fails_fast() {
        let mut bridge =
            SharedMemoryBridge::new(Box::new(LoopbackHost::unwired()), ReadBuffer::new());
        bridge.stage_outgoing().extend_from_slice(b"ctx");
        assert_eq!(bridge.exchange(), Err(BridgeError::Unwired));
    }
}
