use hopline_wire::WireError;
use thiserror::Error;

/// 稳定错误码。
pub mod codes {
    /// 输入字节损坏或截断。
    pub const CORRUPT: &str = "context.corrupt";
    /// 上游阶段以错误负载代替了上下文。
    pub const UPSTREAM: &str = "context.upstream";
}

/// 上下文解码错误。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“字节本身坏了”与“上游主动报告失败”，两者的处置策略都是停止并上报，
///   但排障方向完全不同；
/// - **契约 (What)**：[`ContextError::Upstream`] 仅在首字节为错误标签时产生，此时不会解释后续任何字节。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// 编码损坏，不做部分解码。
    #[error("corrupt context encoding: {0}")]
    Corrupt(#[source] WireError),

    /// 上游阶段上报的错误。
    #[error("upstream stage failed: {0}")]
    Upstream(String),
}

impl ContextError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            ContextError::Corrupt(_) => codes::CORRUPT,
            ContextError::Upstream(_) => codes::UPSTREAM,
        }
    }
}

impl From<WireError> for ContextError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::ErrorValue { message } => ContextError::Upstream(message),
            other => ContextError::Corrupt(other),
        }
    }
}
