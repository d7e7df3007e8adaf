#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `hopline-guest` 是流水线阶段（守护模块）一侧的运行时。
//!
//! # 定位与职责（Why）
//! - 守护模块需要把当前上下文交给下一阶段，再把结果整体换回；两侧不共享内存模型，只能交换字节与偏移量；
//! - 本 crate 提供缓冲桥接（[`bridge`]）与链式调用客户端（[`ChainClient`]），
//!   并在 `wasm32` 目标上生成与宿主约定的导入/导出符号。
//!
//! # 架构嵌入（Where）
//! - [`bridge`]：统一的 [`BufferBridge`] 契约及两种实现：直传数组与共享内存；
//! - [`chain`]：`next()` 的编排、错误旁路与阶段入口；
//! - [`config`]：在装配阶段选定桥接策略，而不是在调用路径中分支；
//! - [`host`]：进程内宿主，便于在同一地址空间内串联多个阶段或模拟共享内存协议；
//! - `telemetry`：进程内运行时的日志订阅者安装；
//! - `wasm`：仅在 `wasm32` 目标编译，承载 `next` 导入与 `resize`/`run` 导出。
//!
//! # 并发模型（What）
//! - 全链路单线程同步执行，`next()` 阻塞到下游整条链返回；
//! - 每个桥接实例同一时刻只允许一次调用在途，重入会被租约拒绝。

pub mod bridge;
pub mod chain;
pub mod config;
mod error;
pub mod host;
#[cfg(not(target_arch = "wasm32"))]
pub mod telemetry;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use bridge::{
    BridgeStrategy, BufferBridge, BufferRegion, DirectArrayBridge, GuestMemory, HostLink,
    Incoming, NextFn, ReadBuffer, RegionPointer, SharedMemoryBridge,
};
pub use chain::{ChainClient, StageResult};
pub use config::{GuestConfig, HostWiring};
pub use error::{BridgeError, ChainError, ConfigError, PipelineError, codes};
pub use host::{InProcessPipeline, LoopbackHost};
pub use hopline_signature::{Context, Request, Response, StringList};

/// 为阶段函数生成 `wasm32` 目标上的 `run` 导出。
///
/// 宿主先调用 `resize` 写入输入上下文，再调用 `run`；返回值高 32 位为输出偏移，低 32 位为长度。
///
/// ```ignore
/// fn scale(ctx: &mut hopline_guest::ChainClient) -> hopline_guest::StageResult {
///     ctx.next()?;
///     Ok(())
/// }
/// hopline_guest::export_stage!(scale);
/// ```
#[macro_export]
macro_rules! export_stage {
    ($stage:path) => {
        #[cfg(target_arch = "wasm32")]
        #[unsafe(no_mangle)]
        pub extern "C" fn run() -> u64 {
            $crate::wasm::run_exported($stage)
        }
    };
}
