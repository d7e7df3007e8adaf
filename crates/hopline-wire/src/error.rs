//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 汇总编解码原语可能出现的失败，区分“字节损坏”与“对端主动上报的错误负载”两类语义；
//! - 每个变体映射到稳定的 `<域>.<语义>` 错误码，便于上层日志与告警聚合。
//!
//! ## 设计要求（What）
//! - 损坏类错误一律视为硬失败，调用方不得尝试继续解释剩余字节；
//! - [`WireError::ErrorValue`] 表示读取到了 `Error` 标签，消息原样保留。

use thiserror::Error;

use crate::Kind;

/// 稳定错误码。
pub mod codes {
    /// 长度前缀或定长值超出剩余字节。
    pub const TRUNCATED: &str = "wire.truncated";
    /// 标签与期望类型不符。
    pub const UNEXPECTED_KIND: &str = "wire.unexpected_kind";
    /// 标签取值不在约定表中。
    pub const UNKNOWN_KIND: &str = "wire.unknown_kind";
    /// 字符串负载不是合法 UTF-8。
    pub const INVALID_UTF8: &str = "wire.invalid_utf8";
    /// 长度超出 `u32` 前缀可表达的范围。
    pub const LENGTH_OVERFLOW: &str = "wire.length_overflow";
    /// 试图跳过无标签结构体。
    pub const UNTAGGED: &str = "wire.untagged";
    /// 嵌套层数超过上限。
    pub const TOO_DEEP: &str = "wire.too_deep";
    /// 遇到了错误负载。
    pub const ERROR_VALUE: &str = "wire.error_value";
}

/// 编解码原语错误域。
///
/// # 教案式说明
/// - **契约 (What)**：除 [`WireError::ErrorValue`] 外均属于“编码损坏”，调用方应直接中止本次解码；
/// - **执行 (How)**：解码器在读取任何长度前缀或定长值之前先做边界检查，失败时返回 [`WireError::Truncated`]。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// 剩余字节不足以构成期望的值。
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// 本次读取需要的字节数。
        needed: usize,
        /// 实际剩余字节数。
        remaining: usize,
    },

    /// 读取到的标签与期望类型不一致。
    #[error("expected {expected}, found tag 0x{found:02x}")]
    UnexpectedKind {
        /// 期望的类型。
        expected: Kind,
        /// 实际读到的标签字节。
        found: u8,
    },

    /// 标签字节不在约定表内。
    #[error("unknown kind tag 0x{0:02x}")]
    UnknownKind(u8),

    /// 字符串负载不是合法的 UTF-8。
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// 长度无法用 `u32` 前缀表达。
    #[error("length {0} does not fit the u32 length prefix")]
    LengthOverflow(usize),

    /// 无标签结构体无法在缺少 schema 的情况下跳过。
    #[error("untagged struct values cannot be skipped without a schema")]
    Untagged,

    /// 数组或映射的嵌套层数超过上限。
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    /// 对端写入的是错误负载而非数据。
    #[error("error value: {message}")]
    ErrorValue {
        /// 错误负载携带的人类可读消息。
        message: String,
    },
}

impl WireError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            WireError::Truncated { .. } => codes::TRUNCATED,
            WireError::UnexpectedKind { .. } => codes::UNEXPECTED_KIND,
            WireError::UnknownKind(_) => codes::UNKNOWN_KIND,
            WireError::InvalidUtf8 => codes::INVALID_UTF8,
            WireError::LengthOverflow(_) => codes::LENGTH_OVERFLOW,
            WireError::Untagged => codes::UNTAGGED,
            WireError::TooDeep(_) => codes::TOO_DEEP,
            WireError::ErrorValue { .. } => codes::ERROR_VALUE,
        }
    }

    /// 是否属于编码损坏（相对于对端主动上报的错误）。
    pub fn is_corruption(&self) -> bool {
        !matches!(self, WireError::ErrorValue { .. })
    }
}
