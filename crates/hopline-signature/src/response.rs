use hopline_wire::{Decode, Decoder, Encode, Encoder, WireError};

use crate::{
    StringList,
    headers::{Headers, decode_headers, encode_headers},
};

/// 出站 HTTP 响应。编码顺序见 [`crate::schema::RESPONSE_FIELDS`]。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    pub(crate) status_code: i32,
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Headers,
}

impl Response {
    /// 状态码，不做范围校验。
    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    /// 设置状态码。
    pub fn set_status_code(&mut self, status_code: i32) -> &mut Self {
        self.status_code = status_code;
        self
    }

    /// 响应正文。
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// 以 UTF-8 文本设置正文。
    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = body.into().into_bytes();
        self
    }

    /// 以原始字节设置正文。
    pub fn set_body_bytes(&mut self, body: Vec<u8>) -> &mut Self {
        self.body = body;
        self
    }

    /// 全部头部。
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// 头部的可变视图。
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// 查询单个头部。
    pub fn header(&self, name: &str) -> Option<&StringList> {
        self.headers.get(name)
    }

    /// 覆盖写入单个头部。
    pub fn set_header(&mut self, name: impl Into<String>, values: Vec<String>) -> &mut Self {
        self.headers.insert(name.into(), StringList::new(values));
        self
    }
}

impl Encode for Response {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
        encoder.i32(self.status_code).bytes(&self.body)?;
        encode_headers(&self.headers, encoder)
    }
}

impl Decode for Response {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(Self {
            status_code: decoder.i32()?,
            body: decoder.bytes()?.to_vec(),
            headers: decode_headers(decoder)?,
        })
    }
}
