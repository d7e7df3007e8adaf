//! 进程内宿主的日志安装入口。
//!
//! 守护模块自身只产生 `tracing` 事件；订阅者由嵌入方安装。进程内运行流水线时，
//! [`install`] 提供与 `RUST_LOG` 兼容的默认组合：环境过滤器加格式化输出层。

use thiserror::Error;
use tracing::dispatcher::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// 日志安装失败。
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// 全局订阅者已被设置。
    #[error("a global tracing subscriber is already installed: {0}")]
    SetGlobal(#[from] SetGlobalDefaultError),
}

/// 安装全局订阅者。
///
/// `RUST_LOG` 存在时以其为准，否则使用 `default_directive`（如 `"hopline_guest=debug"`）。
pub fn install(default_directive: &str) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
