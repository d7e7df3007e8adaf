use hopline_wire::{Decode, Decoder, Encode, Encoder, WireError};

use crate::{
    StringList,
    headers::{Headers, decode_headers, encode_headers},
};

/// 入站 HTTP 请求。
///
/// # 契约说明（What）
/// - `content_length == body.len()` 只由 [`Request::set_body`] / [`Request::set_body_bytes`] 维护；
///   经解码得到的值可能二者不一致，调用方不应在未走设置路径时依赖该等式；
/// - 编码顺序见 [`crate::schema::REQUEST_FIELDS`]。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Request {
    pub(crate) uri: String,
    pub(crate) method: String,
    pub(crate) content_length: i64,
    pub(crate) protocol: String,
    pub(crate) remote_ip: String,
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Headers,
}

impl Request {
    /// 请求方法。
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 设置请求方法。
    pub fn set_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.method = method.into();
        self
    }

    /// 请求 URI。
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 设置请求 URI。
    pub fn set_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.uri = uri.into();
        self
    }

    /// 协议版本，例如 `HTTP/1.1`。
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// 设置协议版本。
    pub fn set_protocol(&mut self, protocol: impl Into<String>) -> &mut Self {
        self.protocol = protocol.into();
        self
    }

    /// 对端地址。
    pub fn remote_ip(&self) -> &str {
        &self.remote_ip
    }

    /// 设置对端地址。
    pub fn set_remote_ip(&mut self, remote_ip: impl Into<String>) -> &mut Self {
        self.remote_ip = remote_ip.into();
        self
    }

    /// 声明的正文长度。
    pub fn content_length(&self) -> i64 {
        self.content_length
    }

    /// 请求正文。
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// 以 UTF-8 文本设置正文，并同步 `content_length`。
    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.set_body_bytes(body.into().into_bytes())
    }

    /// 以原始字节设置正文，并同步 `content_length`。
    pub fn set_body_bytes(&mut self, body: Vec<u8>) -> &mut Self {
        // `Vec` 长度不会超过 `isize::MAX`，可无损放入 i64。
        self.content_length = body.len() as i64;
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

impl Encode for Request {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
        encoder
            .string(&self.uri)?
            .string(&self.method)?
            .i64(self.content_length)
            .string(&self.protocol)?
            .string(&self.remote_ip)?
            .bytes(&self.body)?;
        encode_headers(&self.headers, encoder)
    }
}

impl Decode for Request {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(Self {
            uri: decoder.string()?,
            method: decoder.string()?,
            content_length: decoder.i64()?,
            protocol: decoder.string()?,
            remote_ip: decoder.string()?,
            body: decoder.bytes()?.to_vec(),
            headers: decode_headers(decoder)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_body_keeps_content_length_in_sync() {
        let mut request = Request::default();
        request.set_body("Hello world this is a request body");
        assert_eq!(request.body(), b"Hello world this is a request body");
        assert_eq!(request.content_length(), request.body().len() as i64);
        assert_eq!(request.content_length(), 34);

        request.set_body_bytes(Vec::new());
        assert_eq!(request.content_length(), 0);
    }

    #[test]
    fn decoded_length_may_disagree_with_body() {
        let mut request = Request::default();
        request.set_body("abc");
        request.content_length = 99;
        let bytes = request.to_bytes().expect("encode");
        let decoded = Request::from_slice(&bytes).expect("decode");
        assert_eq!(decoded.content_length(), 99);
        assert_eq!(decoded.body(), b"abc");
    }

    #[test]
    fn setters_chain() {
        let mut request = Request::default();
        request
            .set_method("POST")
            .set_uri("/upload")
            .set_protocol("HTTP/1.1")
            .set_remote_ip("10.0.0.1")
            .set_header("accept", vec!["*/*".to_owned()]);
        assert_eq!(request.method(), "POST");
        assert_eq!(request.uri(), "/upload");
        assert_eq!(request.protocol(), "HTTP/1.1");
        assert_eq!(request.remote_ip(), "10.0.0.1");
        assert_eq!(
            request.header("accept").map(StringList::value),
            Some(&["*/*".to_owned()][..])
        );
    }
}
