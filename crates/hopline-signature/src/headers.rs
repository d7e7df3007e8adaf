use std::collections::HashMap;

use hopline_wire::{Decode, Decoder, Encode, Encoder, WireError};

use crate::{StringList, schema::HEADERS_ENTRY};

/// 头部名到取值列表的映射；条目之间无序，键唯一。
pub type Headers = HashMap<String, StringList>;

/// 按 `Map(String → Any)` 写出头部，值为无标签的 [`StringList`]。
pub(crate) fn encode_headers(headers: &Headers, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
    let (key_kind, value_kind) = HEADERS_ENTRY;
    encoder.map(headers.len(), key_kind, value_kind)?;
    for (name, values) in headers {
        encoder.string(name)?;
        values.encode(encoder)?;
    }
    Ok(())
}

/// 读取头部映射；重复键以后出现者为准。
pub(crate) fn decode_headers(decoder: &mut Decoder<'_>) -> Result<Headers, WireError> {
    let (key_kind, value_kind) = HEADERS_ENTRY;
    let len = decoder.map(key_kind, value_kind)?;
    let mut headers = Headers::with_capacity(len.min(decoder.remaining().len()));
    for _ in 0..len {
        let name = decoder.string()?;
        let values = StringList::decode(decoder)?;
        headers.insert(name, values);
    }
    Ok(headers)
}
