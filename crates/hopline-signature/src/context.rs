use core::fmt;

use bytes::{Bytes, BytesMut};
use hopline_wire::{Decode, Decoder, Encode, Encoder, WireError};
use tracing::debug;

use crate::{ContextError, Headers, Request, Response};

/// 在流水线各阶段之间流转的请求/响应对。
///
/// # 设计背景（Why）
/// - 每个阶段都是独立编译的模块，它们之间唯一共享的是这份值的字节编码；
/// - 解码总是产出完整的新值，旧值随之被整体取代，不存在字段级合并。
///
/// # 契约说明（What）
/// - 新建时字符串为空、长度为零、映射与正文为空；
/// - 编码为 `Request` 与 `Response` 编码的直接拼接（见 [`crate::schema::CONTEXT_FIELDS`]）；
/// - [`Context::decode`] 先判定错误标签，命中时返回 [`ContextError::Upstream`] 且不解释后续字节。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
    request: Request,
    response: Response,
}

impl Context {
    /// 构造空上下文。
    pub fn new() -> Self {
        Self::default()
    }

    /// 由请求与响应组装。
    pub fn from_parts(request: Request, response: Response) -> Self {
        Self { request, response }
    }

    /// 请求视图。
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// 请求的可变视图。
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// 响应视图。
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// 响应的可变视图。
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// 拆分为请求与响应。
    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }

    /// 将编码追加到 `buf` 末尾，返回写入的字节数。
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<usize, WireError> {
        let start = buf.len();
        self.encode(&mut Encoder::new(buf))?;
        let written = buf.len() - start;
        debug!(bytes = written, "encoded context");
        Ok(written)
    }

    /// 编码为独立的只读字节序列。
    pub fn to_bytes(&self) -> Result<Bytes, WireError> {
        Encode::to_bytes(self)
    }

    /// 从字节序列解码出完整上下文。
    ///
    /// # 执行逻辑（How）
    /// 1. 首字节为错误标签时，解出消息并返回 [`ContextError::Upstream`]；
    /// 2. 否则依次解码请求与响应；任何越界或标签不符都返回 [`ContextError::Corrupt`]。
    pub fn decode(src: &[u8]) -> Result<Self, ContextError> {
        let mut decoder = Decoder::new(src);
        if let Some(message) = decoder.error()? {
            return Err(ContextError::Upstream(message));
        }
        let context = <Self as Decode>::decode(&mut decoder)?;
        debug!(
            bytes = src.len(),
            trailing = decoder.remaining().len(),
            "decoded context"
        );
        Ok(context)
    }
}

impl Encode for Context {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
        self.request.encode(encoder)?;
        self.response.encode(encoder)
    }
}

impl Decode for Context {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(Self {
            request: Request::decode(decoder)?,
            response: Response::decode(decoder)?,
        })
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let req = &self.request;
        writeln!(f, "== Context ==")?;
        writeln!(
            f,
            "Request method={}, uri={}, proto={}, ip={}, len={}",
            req.method, req.uri, req.protocol, req.remote_ip, req.content_length
        )?;
        writeln!(f, "  Headers:{}", HeaderLine(&req.headers))?;
        writeln!(f, "  Body: {}", String::from_utf8_lossy(&req.body))?;
        let resp = &self.response;
        writeln!(f, "Response code={}", resp.status_code)?;
        writeln!(f, "  Headers:{}", HeaderLine(&resp.headers))?;
        write!(f, "  Body: {}", String::from_utf8_lossy(&resp.body))
    }
}

/// 按键排序输出 `name=value`，保证渲染结果稳定。
struct HeaderLine<'a>(&'a Headers);

impl fmt::Display for HeaderLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.0.keys().collect();
        names.sort();
        for name in names {
            for value in self.0[name].value() {
                write!(f, " {name}={value}")?;
            }
        }
        Ok(())
    }
}
