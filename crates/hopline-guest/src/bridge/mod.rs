//! # bridge 模块说明
//!
//! ## 角色定位（Why）
//! - 守护模块与宿主之间只能交换字节；不同宿主运行时对内存的访问方式不同，
//!   因此把“交出写缓冲、调用下一阶段、取回结果”抽象为 [`BufferBridge`]；
//! - 策略在装配阶段一次性选定，调用路径上不再出现策略分支。
//!
//! ## 策略（How）
//! - [`DirectArrayBridge`]：宿主可以直接传递字节数组，下一阶段以闭包形式注册；
//! - [`SharedMemoryBridge`]：宿主只认线性内存偏移，结果由宿主回调 `resize` 后直接写入 [`ReadBuffer`]。
//!
//! ## 契约（What）
//! - `stage_outgoing` 返回清空后的写缓冲，编码写入后由 `exchange` 交给下一阶段；
//! - `exchange` 成功后，`incoming` 暴露的字节恰好是下一阶段的完整输出，不残留上一次的内容；
//! - 写缓冲与读缓冲都归桥接实例所有，生命周期与实例相同。

mod direct;
mod region;
mod shared;

use std::fmt;

use bytes::BytesMut;
use serde::Deserialize;

pub use direct::{DirectArrayBridge, NextFn};
pub use region::{BufferRegion, ExchangeLease, Incoming, ReadBuffer};
pub use shared::{GuestMemory, HostLink, SharedMemoryBridge};

use crate::BridgeError;

/// 桥接策略。
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BridgeStrategy {
    /// 宿主直接传递字节数组。
    DirectArray,
    /// 宿主通过线性内存偏移与长度交换数据。
    #[default]
    SharedMemory,
}

impl BridgeStrategy {
    /// 配置文本中使用的名称。
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeStrategy::DirectArray => "direct-array",
            BridgeStrategy::SharedMemory => "shared-memory",
        }
    }
}

impl fmt::Display for BridgeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 宿主可见的一段缓冲：偏移与长度。
///
/// 打包形式为 `offset << 32 | len`，与 `run` 导出的返回值一致。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionPointer {
    /// 缓冲起始偏移。
    pub offset: u32,
    /// 有效字节数。
    pub len: u32,
}

impl RegionPointer {
    /// 构造指针。
    pub fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// 以宿主地址空间描述一个切片。
    pub(crate) fn of(bytes: &[u8]) -> Result<Self, BridgeError> {
        Ok(Self {
            offset: address_of(bytes),
            len: narrow(bytes.len())?,
        })
    }

    /// 打包为单个 `u64`。
    pub fn pack(self) -> u64 {
        (u64::from(self.offset) << 32) | u64::from(self.len)
    }

    /// 从打包值还原。
    pub fn unpack(packed: u64) -> Self {
        Self {
            offset: (packed >> 32) as u32,
            len: packed as u32,
        }
    }
}

/// 守护端缓冲桥接契约。
///
/// # 教案式说明
/// - **意图 (Why)**：链式调用客户端只依赖本契约，与宿主运行时的内存模型解耦；
/// - **执行 (How)**：实现者持有写缓冲与读缓冲；`exchange` 同步阻塞到下一阶段返回；
/// - **契约 (What)**：
///   - `exchange` 失败时，读缓冲内容不作任何保证，调用方不得解码；
///   - 未注册下一阶段时必须立即返回 [`BridgeError::Unwired`]，不允许当作空操作。
pub trait BufferBridge {
    /// 当前实例采用的策略。
    fn strategy(&self) -> BridgeStrategy;

    /// 清空并返回写缓冲，供本阶段写入待发送的编码。
    fn stage_outgoing(&mut self) -> &mut BytesMut;

    /// 写缓冲当前内容。
    fn outgoing(&self) -> &[u8];

    /// 把写缓冲交给下一阶段，并等待其输出落入读缓冲。
    fn exchange(&mut self) -> Result<(), BridgeError>;

    /// 读缓冲当前内容。
    fn incoming(&self) -> Incoming<'_>;

    /// 以宿主直接写入的方式装载读缓冲，用于阶段入口的输入。
    fn load_incoming(&mut self, bytes: &[u8]) -> Result<(), BridgeError>;

    /// 写缓冲在宿主地址空间中的位置。
    fn expose(&self) -> Result<RegionPointer, BridgeError> {
        RegionPointer::of(self.outgoing())
    }
}

/// 切片在宿主地址空间中的偏移。
///
/// `wasm32` 上指针本身即线性内存偏移；其他目标只保留低 32 位，
/// 仅用于进程内宿主做一致性比对。
pub(crate) fn address_of(bytes: &[u8]) -> u32 {
    bytes.as_ptr() as usize as u32
}

pub(crate) fn narrow(len: usize) -> Result<u32, BridgeError> {
    u32::try_from(len).map_err(|_| BridgeError::TooLarge(len))
}
