use hopline_wire::{Decode, Decoder, Encode, Encoder, Kind, WireError};

/// 同一头部名下的多个取值，顺序有意义且必须原样往返。
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StringList {
    value: Vec<String>,
}

impl StringList {
    /// 由取值列表构造。
    pub fn new(value: Vec<String>) -> Self {
        Self { value }
    }

    /// 全部取值。
    pub fn value(&self) -> &[String] {
        &self.value
    }

    /// 追加一个取值。
    pub fn push(&mut self, value: impl Into<String>) {
        self.value.push(value.into());
    }

    /// 取出内部列表。
    pub fn into_inner(self) -> Vec<String> {
        self.value
    }
}

impl From<Vec<String>> for StringList {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<[&str; N]> for StringList {
    fn from(value: [&str; N]) -> Self {
        Self::new(value.iter().map(|v| (*v).to_owned()).collect())
    }
}

impl Encode for StringList {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), WireError> {
        encoder.array(self.value.len(), Kind::String)?;
        for item in &self.value {
            encoder.string(item)?;
        }
        Ok(())
    }
}

impl Decode for StringList {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, WireError> {
        let len = decoder.array(Kind::String)?;
        // 计数来自对端，先按剩余字节收紧预分配。
        let mut value = Vec::with_capacity(len.min(decoder.remaining().len()));
        for _ in 0..len {
            value.push(decoder.string()?);
        }
        Ok(Self { value })
    }
}
