use core::fmt;

/// 编码值前缀的一字节类型标签。
///
/// # 契约说明（What）
/// - 取值在所有实现之间保持稳定，新增类型只能追加新值，不得复用旧值；
/// - [`Kind::Error`] 专用于错误负载，任何数据类型都不得使用该值；
/// - [`Kind::Any`] 只出现在 `Map`/`Array` 头部的元素类型位，表示元素为无标签结构体。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    /// 缺省值，仅写入标签本身。
    None = 0x00,
    /// 数组头部。
    Array = 0x01,
    /// 映射头部。
    Map = 0x02,
    /// 元素为 schema 约定的无标签结构体。
    Any = 0x03,
    /// 原始字节序列。
    Bytes = 0x04,
    /// UTF-8 字符串。
    String = 0x05,
    /// 错误负载。
    Error = 0x06,
    /// 布尔值。
    Bool = 0x07,
    /// 无符号 8 位整数。
    U8 = 0x08,
    /// 无符号 16 位整数。
    U16 = 0x09,
    /// 无符号 32 位整数。
    U32 = 0x0a,
    /// 无符号 64 位整数。
    U64 = 0x0b,
    /// 有符号 32 位整数。
    I32 = 0x0c,
    /// 有符号 64 位整数。
    I64 = 0x0d,
    /// 32 位浮点数。
    F32 = 0x0e,
    /// 64 位浮点数。
    F64 = 0x0f,
}

impl Kind {
    /// 返回标签的线上字节值。
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// 将线上字节还原为标签，未知取值返回 `None`。
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x00 => Kind::None,
            0x01 => Kind::Array,
            0x02 => Kind::Map,
            0x03 => Kind::Any,
            0x04 => Kind::Bytes,
            0x05 => Kind::String,
            0x06 => Kind::Error,
            0x07 => Kind::Bool,
            0x08 => Kind::U8,
            0x09 => Kind::U16,
            0x0a => Kind::U32,
            0x0b => Kind::U64,
            0x0c => Kind::I32,
            0x0d => Kind::I64,
            0x0e => Kind::F32,
            0x0f => Kind::F64,
            _ => return None,
        })
    }

    /// 定长标量值在标签之后占用的字节数；变长或复合类型返回 `None`。
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Kind::None => Some(0),
            Kind::Bool | Kind::U8 => Some(1),
            Kind::U16 => Some(2),
            Kind::U32 | Kind::I32 | Kind::F32 => Some(4),
            Kind::U64 | Kind::I64 | Kind::F64 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02x})", self, self.tag())
    }
}
