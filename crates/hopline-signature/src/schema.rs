//! 上下文 schema 的唯一定义。
//!
//! # 合约说明（What）
//! - 结构体编码不自描述，解码方完全依赖本表的字段顺序与类型；
//! - 任意语言的实现都必须与本表逐项一致，字段顺序不一致属于不兼容的协议破坏，而非可恢复错误；
//! - 调整字段顺序或类型时必须同时提升 [`VERSION`]。

use hopline_wire::Kind;

/// schema 名称。
pub const NAME: &str = "http";

/// schema 版本。
pub const VERSION: &str = "v0.1.1";

/// 结构体中的一个字段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    /// 字段名，仅用于文档与诊断。
    pub name: &'static str,
    /// 字段编码时的首个标签。
    pub kind: Kind,
}

const fn field(name: &'static str, kind: Kind) -> Field {
    Field { name, kind }
}

/// `Context` 的成员顺序：请求在前，响应在后，二者均为无标签结构体。
pub const CONTEXT_FIELDS: [Field; 2] = [field("Request", Kind::Any), field("Response", Kind::Any)];

/// `Request` 的成员顺序。
pub const REQUEST_FIELDS: [Field; 7] = [
    field("URI", Kind::String),
    field("Method", Kind::String),
    field("ContentLength", Kind::I64),
    field("Protocol", Kind::String),
    field("RemoteIP", Kind::String),
    field("Body", Kind::Bytes),
    field("Headers", Kind::Map),
];

/// `Response` 的成员顺序。
pub const RESPONSE_FIELDS: [Field; 3] = [
    field("StatusCode", Kind::I32),
    field("Body", Kind::Bytes),
    field("Headers", Kind::Map),
];

/// `StringList` 的成员：一个字符串数组。
pub const STRING_LIST_FIELDS: [Field; 1] = [field("Value", Kind::Array)];

/// 头部映射的键、值标签：键为字符串，值为无标签的 `StringList`。
pub const HEADERS_ENTRY: (Kind, Kind) = (Kind::String, Kind::Any);

/// 形如 `http@v0.1.1` 的 schema 标识。
pub fn identifier() -> String {
    format!("{NAME}@{VERSION}")
}
