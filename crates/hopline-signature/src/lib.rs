#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `hopline-signature` 定义流水线各阶段之间流转的 HTTP 上下文及其编码。
//!
//! # 模块定位（Why）
//! - 独立编译的模块只共享一份 schema：字段顺序与类型即互通契约；
//! - 本 crate 在 `hopline-wire` 原语之上实现 [`Context`] → [`Request`]/[`Response`] → [`StringList`] 的嵌套结构编解码。
//!
//! # 结构概要（How）
//! - [`schema`]：字段顺序表与版本号，是各语言实现必须逐字对齐的唯一定义；
//! - `context`/`request`/`response`/`string_list`：数据模型、访问器与按 schema 顺序的编解码；
//! - [`runtime`]：宿主侧读写上下文的入口，负责错误负载优先判定与整体替换语义。
//!
//! # 契约说明（What）
//! - 结构体编码为成员编码的直接拼接，没有外层标签或长度前缀；
//! - 解码总是生成完整的新值，不做字段级合并；
//! - 不校验头部名唯一性以外的任何业务约束（状态码范围、头部大小写等均原样透传）。

mod context;
mod error;
mod headers;
mod request;
mod response;
pub mod runtime;
pub mod schema;
mod string_list;

pub use context::Context;
pub use error::{ContextError, codes};
pub use headers::Headers;
pub use request::Request;
pub use response::Response;
pub use runtime::RuntimeContext;
pub use string_list::StringList;
