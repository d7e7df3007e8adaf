use bytes::{BufMut, BytesMut};

use crate::{Kind, WireError};

/// 向 `BytesMut` 追加带标签编码的写入器。
///
/// # 行为概览（How）
/// - 定长标量（整数、布尔）不会失败，方法直接返回 `&mut Self`；
/// - 带长度前缀的值（字符串、字节、数组/映射头、错误）需要把长度收窄为 `u32`，因此返回 `Result`；
/// - 写入器不持有状态，多个值顺序写入即为顺序拼接。
///
/// # 示例
/// ```rust
/// use bytes::BytesMut;
/// use hopline_wire::{Decoder, Encoder};
///
/// let mut buf = BytesMut::new();
/// Encoder::new(&mut buf).string("GET")?.i64(42);
/// let mut decoder = Decoder::new(&buf);
/// assert_eq!(decoder.string()?, "GET");
/// assert_eq!(decoder.i64()?, 42);
/// # Ok::<(), hopline_wire::WireError>(())
/// ```
pub struct Encoder<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> Encoder<'a> {
    /// 在既有缓冲末尾追加写入。
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    /// 已写入缓冲的总字节数（包括构造前已有的内容）。
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// 缓冲是否为空。
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// 写入缺省值标记。
    pub fn none(&mut self) -> &mut Self {
        self.buf.put_u8(Kind::None.tag());
        self
    }

    /// 写入布尔值。
    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(Kind::Bool.tag());
        self.buf.put_u8(u8::from(value));
        self
    }

    /// 写入无符号 32 位整数。
    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u8(Kind::U32.tag());
        self.buf.put_u32(value);
        self
    }

    /// 写入无符号 64 位整数。
    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.put_u8(Kind::U64.tag());
        self.buf.put_u64(value);
        self
    }

    /// 写入有符号 32 位整数。
    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_u8(Kind::I32.tag());
        self.buf.put_i32(value);
        self
    }

    /// 写入有符号 64 位整数。
    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.buf.put_u8(Kind::I64.tag());
        self.buf.put_i64(value);
        self
    }

    /// 写入 UTF-8 字符串。
    pub fn string(&mut self, value: &str) -> Result<&mut Self, WireError> {
        self.buf.put_u8(Kind::String.tag());
        self.length_prefixed(value.as_bytes())
    }

    /// 写入原始字节序列，不解释内容。
    pub fn bytes(&mut self, value: &[u8]) -> Result<&mut Self, WireError> {
        self.buf.put_u8(Kind::Bytes.tag());
        self.length_prefixed(value)
    }

    /// 写入数组头部：元素个数与元素标签，随后由调用方逐个写入元素。
    pub fn array(&mut self, len: usize, element: Kind) -> Result<&mut Self, WireError> {
        let len = narrow(len)?;
        self.buf.put_u8(Kind::Array.tag());
        self.buf.put_u32(len);
        self.buf.put_u8(element.tag());
        Ok(self)
    }

    /// 写入映射头部：条目个数与键、值标签，随后由调用方逐个写入“键 + 值”。
    pub fn map(&mut self, len: usize, key: Kind, value: Kind) -> Result<&mut Self, WireError> {
        let len = narrow(len)?;
        self.buf.put_u8(Kind::Map.tag());
        self.buf.put_u32(len);
        self.buf.put_u8(key.tag());
        self.buf.put_u8(value.tag());
        Ok(self)
    }

    /// 写入错误负载。
    ///
    /// 错误消息按长度前缀的 UTF-8 编码，接收方通过首字节 [`Kind::Error`] 识别。
    pub fn error(&mut self, message: &str) -> Result<&mut Self, WireError> {
        self.buf.put_u8(Kind::Error.tag());
        self.length_prefixed(message.as_bytes())
    }

    fn length_prefixed(&mut self, payload: &[u8]) -> Result<&mut Self, WireError> {
        let len = narrow(payload.len())?;
        self.buf.reserve(4 + payload.len());
        self.buf.put_u32(len);
        self.buf.put_slice(payload);
        Ok(self)
    }
}

fn narrow(len: usize) -> Result<u32, WireError> {
    u32::try_from(len).map_err(|_| WireError::LengthOverflow(len))
}
