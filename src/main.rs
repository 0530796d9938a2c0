use mobviol_core::{api, build_state, config::Config, logging, store::FixtureStore};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ----------------------------------------------------------------
    // 0. 日志 & 配置
    // ----------------------------------------------------------------
    dotenvy::dotenv().ok();
    logging::init()?;

    let config = Config::from_env()?;
    tracing::info!("⚙️  配置加载完成: Addr={}, CaptionPeriod={:?}", config.addr(), config.caption_period);

    // ----------------------------------------------------------------
    // 1. 加载夹具（编译期选定，只读）
    // ----------------------------------------------------------------
    let store = FixtureStore::active()?;
    tracing::info!(
        "🎬 数据集: {} ({} actors, {} events, {} captions), 指纹={}",
        store.scene().title,
        store.actors().len(),
        store.events().len(),
        store.captions().len(),
        &store.fingerprint()[..12]
    );

    // ----------------------------------------------------------------
    // 2. 状态共享容器
    // ----------------------------------------------------------------
    let shared_state = build_state(store, config.caption_period);
    let playback = shared_state.playback.clone();

    // ----------------------------------------------------------------
    // 3. 启动 HTTP 服务
    // ----------------------------------------------------------------
    let app = api::app(shared_state);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("🚀 API 服务已运行在: http://{}", addr);
    tracing::info!("   - GET  /api/dataset : 完整数据集 (ETag)");
    tracing::info!("   - GET  /api/feed    : 字幕流状态与可见字幕");
    tracing::info!("   - GET  /api/feed/stream : 字幕流推送 (SSE)");
    tracing::info!("   - POST /api/feed/{{start,stop,toggle,restart,show-all}}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 退出路径上显式取消字幕定时器
    playback.shutdown().await;
    tracing::info!("👋 服务已停止");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听 Ctrl-C: {}", e);
        // 监听失败就永远不触发关闭
        std::future::pending::<()>().await;
    }
}
