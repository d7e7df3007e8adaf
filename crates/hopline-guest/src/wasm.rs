//! `wasm32` 目标上的宿主 ABI。
//!
//! - 导入：`env.next(offset: u32, len: u32)`，宿主在其中运行下游整条链，返回前回调 `resize` 并写入结果；
//! - 导出：`resize(len: u32) -> u32` 返回读缓冲偏移；`run() -> u64` 由 [`export_stage!`](crate::export_stage) 为阶段函数生成。
//!
//! 读缓冲与链式调用客户端都是模块实例级的单例，生命周期与实例相同。
#![allow(unsafe_code)]

use std::cell::RefCell;

use tracing::error;

use crate::{
    BridgeError, ChainClient, GuestConfig, GuestMemory, HostLink, HostWiring, ReadBuffer,
    StageResult,
};

#[link(wasm_import_module = "env")]
unsafe extern "C" {
    #[link_name = "next"]
    fn host_next(offset: u32, len: u32);
}

thread_local! {
    static READ_BUFFER: ReadBuffer = ReadBuffer::new();
    static CLIENT: RefCell<Option<ChainClient>> = const { RefCell::new(None) };
}

/// 实例级读缓冲句柄。
pub fn read_buffer() -> ReadBuffer {
    READ_BUFFER.with(ReadBuffer::clone)
}

/// 宿主写入结果前调用：把读缓冲调整为 `size` 字节并返回其偏移。
#[unsafe(no_mangle)]
pub extern "C" fn resize(size: u32) -> u32 {
    READ_BUFFER.with(|buffer| buffer.resize(size))
}

/// 通过 `env.next` 导入调用宿主。
///
/// 宿主直接读写线性内存，`memory` 参数在此不被使用；越界由宿主运行时自身的内存保护兜底。
#[derive(Debug, Default)]
pub struct WasmHostLink;

impl HostLink for WasmHostLink {
    fn next(
        &mut self,
        offset: u32,
        len: u32,
        _memory: &mut dyn GuestMemory,
    ) -> Result<(), BridgeError> {
        // SAFETY: 参数描述的是本实例写缓冲，在调用返回前保持存活且不被修改。
        unsafe { host_next(offset, len) };
        Ok(())
    }
}

/// `run` 导出的实现：读取宿主写入的输入，执行 `stage`，返回打包后的输出位置。
pub fn run_exported<F>(stage: F) -> u64
where
    F: FnOnce(&mut ChainClient) -> StageResult,
{
    CLIENT.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            error!(code = crate::codes::BRIDGE_REENTRANT, "run invoked while a stage is executing");
            return 0;
        };
        if slot.is_none() {
            let wiring = HostWiring::Shared {
                link: Box::new(WasmHostLink),
                read: read_buffer(),
            };
            match GuestConfig::default().client(wiring) {
                Ok(client) => *slot = Some(client),
                Err(err) => {
                    error!(code = err.code(), error = %err, "guest bridge could not be built");
                    return 0;
                }
            }
        }
        match slot.as_mut() {
            Some(client) => client.run_stage(stage),
            None => 0,
        }
    })
}
