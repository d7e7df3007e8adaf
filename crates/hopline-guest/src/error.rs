//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 对应三类失败：编码损坏、上游主动上报、装配缺陷（未注册下一阶段）；
//! - 所有变体都映射到稳定错误码，日志字段 `code` 统一使用这些取值。
//!
//! ## 设计要求（What）
//! - 本层不做任何重试，重试属于外部宿主调度器的策略；
//! - 装配缺陷必须立即失败，不允许静默降级为空操作。

use hopline_signature::ContextError;
use hopline_wire::WireError;
use thiserror::Error;

use crate::BridgeStrategy;

/// 稳定错误码。
pub mod codes {
    /// 未注册下一阶段。
    pub const BRIDGE_UNWIRED: &str = "bridge.unwired";
    /// 同一缓冲上已有调用在途。
    pub const BRIDGE_REENTRANT: &str = "bridge.reentrant";
    /// 宿主访问越界。
    pub const BRIDGE_OUT_OF_BOUNDS: &str = "bridge.out_of_bounds";
    /// 宿主返回前没有调用 `resize`。
    pub const BRIDGE_NOT_RESIZED: &str = "bridge.not_resized";
    /// 负载超出 32 位地址空间。
    pub const BRIDGE_TOO_LARGE: &str = "bridge.too_large";
    /// 宿主侧失败。
    pub const BRIDGE_HOST: &str = "bridge.host";
    /// 上下文编码失败。
    pub const CHAIN_ENCODE: &str = "chain.encode";
    /// 上游阶段上报错误。
    pub const CHAIN_UPSTREAM: &str = "chain.upstream";
    /// 返回字节损坏。
    pub const CHAIN_CORRUPT: &str = "chain.corrupt";
    /// 配置文本无法解析。
    pub const CONFIG_PARSE: &str = "config.parse";
    /// 装配参数与策略不匹配。
    pub const CONFIG_WIRING: &str = "config.wiring";
}

/// 缓冲桥接错误域。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// 宿主没有注册下一阶段。
    #[error("no next stage is registered for this guest")]
    Unwired,

    /// 同一读缓冲上已有调用在途。
    #[error("a chain call is already in flight on this buffer")]
    Reentrant,

    /// 宿主读写的偏移或长度不在对应缓冲内。
    #[error("host access out of bounds: offset {offset}, len {len}")]
    OutOfBounds {
        /// 宿主给出的偏移。
        offset: u32,
        /// 宿主请求的长度。
        len: usize,
    },

    /// 宿主返回时读缓冲仍是上一次调用的内容。
    #[error("host returned without resizing the read buffer")]
    NotResized,

    /// 负载长度无法用 32 位表达。
    #[error("payload of {0} bytes exceeds the 32-bit address space")]
    TooLarge(usize),

    /// 宿主或进程内下游自身失败。
    #[error("host failure: {0}")]
    Host(String),
}

impl BridgeError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Unwired => codes::BRIDGE_UNWIRED,
            BridgeError::Reentrant => codes::BRIDGE_REENTRANT,
            BridgeError::OutOfBounds { .. } => codes::BRIDGE_OUT_OF_BOUNDS,
            BridgeError::NotResized => codes::BRIDGE_NOT_RESIZED,
            BridgeError::TooLarge(_) => codes::BRIDGE_TOO_LARGE,
            BridgeError::Host(_) => codes::BRIDGE_HOST,
        }
    }
}

/// 链式调用错误域。
///
/// # 教案式说明
/// - **契约 (What)**：[`ChainError::Upstream`] 只在返回字节以错误标签开头时产生，此时活动上下文保持调用前的内容；
/// - **执行 (How)**：桥接错误通过 `From` 直接折叠进来，阶段函数可以用 `?` 传播。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// 活动上下文无法编码。
    #[error("failed to encode context: {0}")]
    Encode(#[source] WireError),

    /// 缓冲桥接失败。
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// 下游阶段返回了错误负载。
    #[error("upstream stage failed: {0}")]
    Upstream(String),

    /// 读缓冲中的字节无法解码。
    #[error("corrupt context bytes: {0}")]
    Corrupt(#[source] WireError),
}

impl ChainError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            ChainError::Encode(_) => codes::CHAIN_ENCODE,
            ChainError::Bridge(err) => err.code(),
            ChainError::Upstream(_) => codes::CHAIN_UPSTREAM,
            ChainError::Corrupt(_) => codes::CHAIN_CORRUPT,
        }
    }
}

/// 进程内流水线错误域。
///
/// - **契约 (What)**：各变体保留来源错误域的错误码，调用方可以区分阶段上报的失败
///   （`context.*`）与桥接本身的故障（`bridge.*`）；
/// - **执行 (How)**：输入上下文编码失败归入 [`PipelineError::Encode`]，不与解码损坏混淆。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// 初始上下文无法编码。
    #[error("failed to encode pipeline input: {0}")]
    Encode(#[source] WireError),

    /// 第一阶段的输出是错误负载或损坏字节。
    #[error(transparent)]
    Context(#[from] ContextError),

    /// 驱动第一阶段时桥接失败。
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl PipelineError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Encode(_) => codes::CHAIN_ENCODE,
            PipelineError::Context(err) => err.code(),
            PipelineError::Bridge(err) => err.code(),
        }
    }
}

/// 装配错误域。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文本解析失败。
    #[error("invalid guest configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// 传入的宿主装配与配置的策略不一致。
    #[error("strategy `{strategy}` cannot be built from {wiring} wiring")]
    Wiring {
        /// 配置选定的策略。
        strategy: BridgeStrategy,
        /// 实际传入的装配种类。
        wiring: &'static str,
    },
}

impl ConfigError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Parse(_) => codes::CONFIG_PARSE,
            ConfigError::Wiring { .. } => codes::CONFIG_WIRING,
        }
    }
}
