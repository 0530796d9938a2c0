//! 日志初始化

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RUST_LOG 未设置时的默认过滤规则
pub const DEFAULT_FILTER: &str = "mobviol_core=debug,tower_http=info";

/// 安装全局 tracing subscriber（stdout）。重复调用返回错误，不 panic。
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
