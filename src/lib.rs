//! 暴力场景监控仪表盘后端
//!
//! 把两段电影打斗场景的预编写分析数据（演员、暴力事件、LSTM 预测、字幕、武器清单、
//! 模型指标、时间序列）通过 HTTP/JSON 提供给前端，外加一个按固定节拍揭示字幕的序列器，
//! 用来模拟"实时字幕流"。所有数字和句子都是夹具常量，没有任何推理在这里执行。
//!
//! - `fixture` / `store`: 数据模型与只读夹具仓库
//! - `analytics`: 按需重算的汇总统计
//! - `sequencer` / `playback`: 字幕序列器与驱动它的可取消定时器
//! - `api`: axum 路由

pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod fixture;
pub mod logging;
pub mod playback;
pub mod sequencer;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use playback::Playback;
use store::FixtureStore;

/// 按夹具里的场景常量（和可选的节拍覆盖）组装应用状态
pub fn build_state(store: FixtureStore, period_override: Option<Duration>) -> Arc<api::AppState> {
    let scene = store.scene();
    let period = period_override.unwrap_or(Duration::from_millis(scene.caption_period_ms));
    let playback = Playback::new(store.captions().len(), scene.seed_captions, period);

    Arc::new(api::AppState {
        store: Arc::new(store),
        playback: Arc::new(playback),
    })
}
