//! # config 模块说明
//!
//! ## 角色定位（Why）
//! - 桥接策略由部署环境决定，而不是由阶段代码决定；
//! - 通过 TOML 描述一次，装配时与宿主提供的链路一起构造出 [`BufferBridge`] 实例。
//!
//! ## 配置格式（What）
//! ```toml
//! strategy = "shared-memory"   # 或 "direct-array"
//! write_capacity = 1024        # 写缓冲初始容量，可省略
//! ```

use serde::Deserialize;
use tracing::{debug, error};

use crate::{
    BridgeStrategy, BufferBridge, ChainClient, ConfigError, DirectArrayBridge, HostLink, NextFn,
    ReadBuffer, SharedMemoryBridge, codes,
};

/// 写缓冲默认初始容量，足以容纳不含正文的典型上下文。
pub const DEFAULT_WRITE_CAPACITY: usize = 512;

/// 守护端配置。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GuestConfig {
    /// 桥接策略。
    pub strategy: BridgeStrategy,
    /// 写缓冲初始容量。
    pub write_capacity: usize,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            strategy: BridgeStrategy::default(),
            write_capacity: DEFAULT_WRITE_CAPACITY,
        }
    }
}

/// 宿主在装配阶段提供的链路。
pub enum HostWiring {
    /// 直传策略：下一阶段闭包；`None` 表示末端阶段。
    Direct {
        /// 下一阶段。
        next: Option<NextFn>,
    },
    /// 共享内存策略：宿主链路与读缓冲。
    Shared {
        /// 宿主 `next` 导入。
        link: Box<dyn HostLink>,
        /// 与 `resize` 导出共享的读缓冲。
        read: ReadBuffer,
    },
}

impl HostWiring {
    fn kind(&self) -> &'static str {
        match self {
            HostWiring::Direct { .. } => "direct",
            HostWiring::Shared { .. } => "shared",
        }
    }
}

impl GuestConfig {
    /// 解析 TOML 文本。
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        debug!(strategy = %config.strategy, write_capacity = config.write_capacity, "guest config loaded");
        Ok(config)
    }

    /// 按配置的策略构造桥接。
    ///
    /// # 契约 (What)
    /// - 装配种类必须与策略一致，否则返回 [`ConfigError::Wiring`]；
    /// - 直传策略下 `next` 为 `None` 时仍然成功构造，首次 `next()` 调用时才报告未注册。
    pub fn build(&self, wiring: HostWiring) -> Result<Box<dyn BufferBridge>, ConfigError> {
        let capacity = self.write_capacity;
        match (self.strategy, wiring) {
            (BridgeStrategy::DirectArray, HostWiring::Direct { next }) => {
                let mut bridge = DirectArrayBridge::with_capacity(capacity);
                if let Some(next) = next {
                    bridge.register(next);
                }
                Ok(Box::new(bridge))
            }
            (BridgeStrategy::SharedMemory, HostWiring::Shared { link, read }) => Ok(Box::new(
                SharedMemoryBridge::with_capacity(link, read, capacity),
            )),
            (strategy, wiring) => {
                let wiring = wiring.kind();
                error!(code = codes::CONFIG_WIRING, %strategy, wiring, "host wiring does not match strategy");
                Err(ConfigError::Wiring { strategy, wiring })
            }
        }
    }

    /// 构造桥接并包装为链式调用客户端。
    pub fn client(&self, wiring: HostWiring) -> Result<ChainClient, ConfigError> {
        self.build(wiring).map(ChainClient::new)
    }
}
