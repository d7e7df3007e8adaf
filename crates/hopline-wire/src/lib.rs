#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `hopline-wire` 提供跨 WASM 模块边界交换数据时使用的二进制编码原语。
//!
//! # 模块定位（Why）
//! - 流水线中的每个模块独立编译，彼此不共享内存模型与类型系统；它们只共享一段自包含的字节序列。
//! - 本 crate 负责“原语层”：每个基础值前缀一个字节的 [`Kind`] 标签，使接收方在不知道具体类型时
//!   也能识别“这是一个错误负载”还是“正常数据”。
//!
//! # 使用概览（How）
//! - 编码端通过 [`Encoder`] 向 `BytesMut` 追加值，方法均返回 `&mut Encoder` 以便链式书写；
//! - 解码端通过 [`Decoder`] 从切片头部逐个消费值，剩余字节可随时通过 [`Decoder::remaining`] 取回；
//! - 复合结构实现 [`Encode`]/[`Decode`]，按固定字段顺序串接成员编码，结构本身**不带**标签或长度前缀。
//!
//! # 合约说明（What）
//! - 标签取值见 [`Kind`]，跨语言实现必须保持一致；[`Kind::Error`] 仅用于错误负载；
//! - 整数采用与声明位宽一致的定长大端表示；字符串/字节数组以 `u32` 大端长度前缀；
//! - 任何越界、标签不符或 UTF-8 非法都视为硬失败，不做部分解码。

mod decoder;
mod encoder;
mod error;
mod kind;

pub use decoder::{Decoder, MAX_SKIP_DEPTH};
pub use encoder::Encoder;
pub use error::{WireError, codes};
pub use kind::Kind;

use bytes::{Bytes, BytesMut};

/// 将值按约定格式追加到编码器。
///
/// 结构体实现应按 schema 约定的字段顺序依次写入成员，不额外写入任何包裹标签。
pub trait Encode {
    /// 将自身编码写入 `encoder`。
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError>;

    /// 编码为独立的只读字节序列。
    fn to_bytes(&self) -> Result<Bytes, WireError> {
        let mut buf = BytesMut::new();
        self.encode(&mut Encoder::new(&mut buf))?;
        Ok(buf.freeze())
    }
}

/// 从解码器中读取一个完整值。
pub trait Decode: Sized {
    /// 从 `decoder` 头部消费恰好构成一个值的字节。
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError>;

    /// 从切片开头解码一个值，并先行检查错误标签。
    ///
    /// # 契约说明（What）
    /// - 首字节为 [`Kind::Error`] 时返回 [`WireError::ErrorValue`]，不会继续解释后续字节；
    /// - 值之后的多余字节被忽略，调用方若关心可改用 [`Decoder`] 手动检查剩余量。
    fn from_slice(src: &[u8]) -> Result<Self, WireError> {
        let mut decoder = Decoder::new(src);
        if let Some(message) = decoder.error()? {
            return Err(WireError::ErrorValue { message });
        }
        Self::decode(&mut decoder)
    }
}

impl Encode for String {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
        encoder.string(self)?;
        Ok(())
    }
}

impl Decode for String {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError> {
        decoder.string()
    }
}

impl Encode for Vec<u8> {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
        encoder.bytes(self)?;
        Ok(())
    }
}

impl Decode for Vec<u8> {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError> {
        decoder.bytes().map(<[u8]>::to_vec)
    }
}

impl Encode for i32 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
        encoder.i32(*self);
        Ok(())
    }
}

impl Decode for i32 {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError> {
        decoder.i32()
    }
}

impl Encode for i64 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
        encoder.i64(*self);
        Ok(())
    }
}

impl Decode for i64 {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError> {
        decoder.i64()
    }
}
