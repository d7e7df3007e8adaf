//! `primitives_contract` 集成测试：从外部 crate 视角校验原语编码的线上契约。
//!
//! # 测试总览（Why）
//! - 标签取值与字节布局是跨语言实现共享的协议，一旦漂移，独立编译的模块将无法互通；
//! - 以属性测试覆盖任意输入下“消费恰好一个值、剩余字节原样保留”的约束。

use bytes::BytesMut;
use hopline_wire::{Decode, Decoder, Encode, Encoder, Kind, WireError, codes};
use proptest::prelude::*;

/// 标签表是协议的一部分，这里逐项钉住取值。
#[test]
fn kind_tags_are_pinned() {
    let table = [
        (Kind::None, 0x00),
        (Kind::Array, 0x01),
        (Kind::Map, 0x02),
        (Kind::Any, 0x03),
        (Kind::Bytes, 0x04),
        (Kind::String, 0x05),
        (Kind::Error, 0x06),
        (Kind::Bool, 0x07),
        (Kind::U32, 0x0a),
        (Kind::U64, 0x0b),
        (Kind::I32, 0x0c),
        (Kind::I64, 0x0d),
    ];
    for (kind, tag) in table {
        assert_eq!(kind.tag(), tag, "{kind:?}");
    }
}

/// `from_slice` 在首字节为错误标签时不再解释后续字节。
#[test]
fn from_slice_checks_error_tag_first() {
    let mut buf = BytesMut::new();
    Encoder::new(&mut buf).error("stage failed").expect("encode error");
    // 错误负载之后追加一段损坏数据，解码结果仍应只反映错误负载。
    buf.extend_from_slice(&[0xff, 0xff]);
    let err = String::from_slice(&buf).expect_err("error value");
    assert_eq!(err.code(), codes::ERROR_VALUE);
    assert_eq!(err.to_string(), "error value: stage failed");
}

#[test]
fn empty_input_is_truncated() {
    let err = i64::from_slice(&[]).expect_err("empty");
    assert_eq!(
        err,
        WireError::Truncated {
            needed: 1,
            remaining: 0
        }
    );
    assert_eq!(err.code(), codes::TRUNCATED);
}

#[test]
fn byte_payload_is_not_interpreted() {
    let body = vec![0x06, 0x00, 0xff, 0x05];
    let encoded = body.to_bytes().expect("encode");
    assert_eq!(encoded[0], Kind::Bytes.tag());
    assert_eq!(Vec::<u8>::from_slice(&encoded).expect("decode"), body);
}

#[test]
fn none_marker_is_a_single_tag() {
    let mut buf = BytesMut::new();
    Encoder::new(&mut buf).none().i32(3);
    let mut decoder = Decoder::new(&buf);
    assert!(decoder.none());
    assert!(!decoder.none());
    assert_eq!(decoder.i32().expect("i32"), 3);
}

proptest! {
    #[test]
    fn string_then_tail_is_consumed_exactly(text in ".*", tail in proptest::collection::vec(any::<u8>(), 0..16)) {
        let mut buf = BytesMut::new();
        Encoder::new(&mut buf).string(&text).expect("encode");
        buf.extend_from_slice(&tail);
        let mut decoder = Decoder::new(&buf);
        prop_assert_eq!(decoder.string().expect("decode"), text);
        prop_assert_eq!(decoder.remaining(), &tail[..]);
    }

    #[test]
    fn integers_keep_sign_and_width(a in any::<i32>(), b in any::<i64>(), c in any::<u32>(), d in any::<u64>()) {
        let mut buf = BytesMut::new();
        Encoder::new(&mut buf).i32(a).i64(b).u32(c).u64(d);
        prop_assert_eq!(buf.len(), 5 + 9 + 5 + 9);
        let mut decoder = Decoder::new(&buf);
        prop_assert_eq!(decoder.i32().expect("i32"), a);
        prop_assert_eq!(decoder.i64().expect("i64"), b);
        prop_assert_eq!(decoder.u32().expect("u32"), c);
        prop_assert_eq!(decoder.u64().expect("u64"), d);
        prop_assert!(decoder.is_empty());
    }

    #[test]
    fn truncation_never_panics(text in ".{1,32}", cut in 0usize..40) {
        let mut buf = BytesMut::new();
        Encoder::new(&mut buf).string(&text).expect("encode");
        let cut = cut.min(buf.len() - 1);
        let result = Decoder::new(&buf[..cut]).string();
        prop_assert!(matches!(result, Err(WireError::Truncated { .. })), "expected Truncated, got {:?}", result);
    }
}
