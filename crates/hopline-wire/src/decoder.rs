use bytes::Buf;

use crate::{Kind, WireError};

/// [`Decoder::skip`] 允许的数组/映射最大嵌套层数。
pub const MAX_SKIP_DEPTH: usize = 64;

/// 从切片头部逐个消费带标签值的读取器。
///
/// # 设计动机（Why）
/// - 编码格式在结构体层面不自描述，解码方必须按 schema 顺序逐个读取成员；
/// - 读取器只借用输入切片，不复制底层字节，字节数组可以零拷贝借出。
///
/// # 契约说明（What）
/// - 每个读取方法恰好消费一个值；失败时读取器状态不再可靠，调用方应放弃本次解码；
/// - 期望数据值却读到 [`Kind::Error`] 时，返回 [`WireError::ErrorValue`] 而非标签不符；
/// - 所有长度前缀在切片之前完成边界检查，越界返回 [`WireError::Truncated`]。
#[derive(Clone, Debug)]
pub struct Decoder<'a> {
    src: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// 从切片开头开始读取。
    pub fn new(src: &'a [u8]) -> Self {
        Self { src }
    }

    /// 尚未消费的字节。
    pub fn remaining(&self) -> &'a [u8] {
        self.src
    }

    /// 是否已消费完全部输入。
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// 查看下一个值的标签但不消费；输入耗尽时返回 `Ok(None)`。
    pub fn peek_kind(&self) -> Result<Option<Kind>, WireError> {
        match self.src.first() {
            None => Ok(None),
            Some(&tag) => Kind::from_tag(tag)
                .map(Some)
                .ok_or(WireError::UnknownKind(tag)),
        }
    }

    /// 下一个值是否为缺省值标记。
    pub fn is_none(&self) -> bool {
        self.src.first() == Some(&Kind::None.tag())
    }

    /// 若下一个值为缺省值标记则消费并返回 `true`。
    pub fn none(&mut self) -> bool {
        if self.is_none() {
            self.src.advance(1);
            true
        } else {
            false
        }
    }

    /// 若下一个值为错误负载，则消费并返回其消息；否则不消费任何字节。
    pub fn error(&mut self) -> Result<Option<String>, WireError> {
        if self.src.first() != Some(&Kind::Error.tag()) {
            return Ok(None);
        }
        self.src.advance(1);
        self.utf8_payload().map(Some)
    }

    /// 读取布尔值。
    pub fn bool(&mut self) -> Result<bool, WireError> {
        self.expect(Kind::Bool)?;
        self.ensure(1)?;
        Ok(self.src.get_u8() != 0)
    }

    /// 读取无符号 32 位整数。
    pub fn u32(&mut self) -> Result<u32, WireError> {
        self.expect(Kind::U32)?;
        self.ensure(4)?;
        Ok(self.src.get_u32())
    }

    /// 读取无符号 64 位整数。
    pub fn u64(&mut self) -> Result<u64, WireError> {
        self.expect(Kind::U64)?;
        self.ensure(8)?;
        Ok(self.src.get_u64())
    }

    /// 读取有符号 32 位整数。
    pub fn i32(&mut self) -> Result<i32, WireError> {
        self.expect(Kind::I32)?;
        self.ensure(4)?;
        Ok(self.src.get_i32())
    }

    /// 读取有符号 64 位整数。
    pub fn i64(&mut self) -> Result<i64, WireError> {
        self.expect(Kind::I64)?;
        self.ensure(8)?;
        Ok(self.src.get_i64())
    }

    /// 读取 UTF-8 字符串。
    pub fn string(&mut self) -> Result<String, WireError> {
        self.expect(Kind::String)?;
        self.utf8_payload()
    }

    /// 读取字节数组，返回借用自输入的切片。
    pub fn bytes(&mut self) -> Result<&'a [u8], WireError> {
        self.expect(Kind::Bytes)?;
        self.length_prefixed()
    }

    /// 读取数组头部并返回元素个数；元素标签必须与 `element` 一致。
    pub fn array(&mut self, element: Kind) -> Result<usize, WireError> {
        self.expect(Kind::Array)?;
        let len = self.raw_u32()? as usize;
        self.expect_raw(element)?;
        Ok(len)
    }

    /// 读取映射头部并返回条目个数；键、值标签必须与约定一致。
    pub fn map(&mut self, key: Kind, value: Kind) -> Result<usize, WireError> {
        self.expect(Kind::Map)?;
        let len = self.raw_u32()? as usize;
        self.expect_raw(key)?;
        self.expect_raw(value)?;
        Ok(len)
    }

    /// 跳过一个完整的带标签值并返回其类型。
    ///
    /// 元素类型为 [`Kind::Any`] 的数组或映射需要 schema 才能解析，返回 [`WireError::Untagged`]；
    /// 数组与映射的嵌套超过 [`MAX_SKIP_DEPTH`] 层时返回 [`WireError::TooDeep`]。
    pub fn skip(&mut self) -> Result<Kind, WireError> {
        self.skip_nested(0)
    }

    fn skip_nested(&mut self, depth: usize) -> Result<Kind, WireError> {
        self.ensure(1)?;
        let tag = self.src.get_u8();
        let kind = Kind::from_tag(tag).ok_or(WireError::UnknownKind(tag))?;
        match kind {
            Kind::String | Kind::Bytes | Kind::Error => {
                self.length_prefixed()?;
            }
            Kind::Array | Kind::Map => {
                if depth >= MAX_SKIP_DEPTH {
                    return Err(WireError::TooDeep(MAX_SKIP_DEPTH));
                }
                let len = self.raw_u32()?;
                let (key, value) = if kind == Kind::Map {
                    (self.raw_kind()?, self.raw_kind()?)
                } else {
                    (Kind::None, self.raw_kind()?)
                };
                if key == Kind::Any || value == Kind::Any {
                    return Err(WireError::Untagged);
                }
                let per_entry = if kind == Kind::Map { 2 } else { 1 };
                for _ in 0..len {
                    for _ in 0..per_entry {
                        self.skip_nested(depth + 1)?;
                    }
                }
            }
            Kind::Any => return Err(WireError::Untagged),
            scalar => {
                let width = scalar.fixed_width().unwrap_or_default();
                self.ensure(width)?;
                self.src.advance(width);
            }
        }
        Ok(kind)
    }

    /// 消费一个标签并校验。读到错误标签时解出消息，转为 [`WireError::ErrorValue`]。
    fn expect(&mut self, expected: Kind) -> Result<(), WireError> {
        self.ensure(1)?;
        let found = self.src.get_u8();
        if found == expected.tag() {
            return Ok(());
        }
        if found == Kind::Error.tag() {
            let message = self.utf8_payload()?;
            return Err(WireError::ErrorValue { message });
        }
        Err(WireError::UnexpectedKind { expected, found })
    }

    /// 头部内的元素类型位：只做等值校验，不触发错误负载解析。
    fn expect_raw(&mut self, expected: Kind) -> Result<(), WireError> {
        self.ensure(1)?;
        let found = self.src.get_u8();
        if found != expected.tag() {
            return Err(WireError::UnexpectedKind { expected, found });
        }
        Ok(())
    }

    fn raw_kind(&mut self) -> Result<Kind, WireError> {
        self.ensure(1)?;
        let tag = self.src.get_u8();
        Kind::from_tag(tag).ok_or(WireError::UnknownKind(tag))
    }

    fn raw_u32(&mut self) -> Result<u32, WireError> {
        self.ensure(4)?;
        Ok(self.src.get_u32())
    }

    fn length_prefixed(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.raw_u32()? as usize;
        self.ensure(len)?;
        let (payload, rest) = self.src.split_at(len);
        self.src = rest;
        Ok(payload)
    }

    fn utf8_payload(&mut self) -> Result<String, WireError> {
        let payload = self.length_prefixed()?;
        core::str::from_utf8(payload)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8)
    }

    fn ensure(&self, needed: usize) -> Result<(), WireError> {
        if self.src.len() < needed {
            return Err(WireError::Truncated {
                needed,
                remaining: self.src.len(),
            });
        }
        Ok(())
    }
}
