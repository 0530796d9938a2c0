use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    analytics::{self, QuickStats, RadarPoint, Share, ThreatStats},
    error::{AppError, AppResult},
    fingerprint,
    fixture::{
        Actor, Caption, CaptorInfo, ModelInfo, Prediction, Scene, ThreatLevel, TimeSeriesPoint,
        ViolenceEvent, WeaponSummary,
    },
    playback::Playback,
    sequencer::{Sequencer, SequencerState},
    store::{FixtureStore, InvolvedActor},
};

// ==========================================
// 1. 定义应用状态 (Shared State)
// ==========================================
// 夹具仓库只读，直接 Arc 共享；回放会话内部自带锁。
pub struct AppState {
    pub store: Arc<FixtureStore>,
    pub playback: Arc<Playback>,
}

// ==========================================
// 2. 数据传输对象 (DTOs)
// ==========================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    dataset: &'static str,
    feed: SequencerState,
    timer_live: bool,
    timestamp: i64,
}

#[derive(Deserialize)]
pub struct ActorFilter {
    pub threat: Option<ThreatLevel>,
}

#[derive(Deserialize)]
pub struct PredictionFilter {
    pub risk: Option<ThreatLevel>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneResponse<'a> {
    pub scene: &'a Scene,
    pub captor: &'a CaptorInfo,
    pub model: &'a ModelInfo,
}

/// 事件 + 解析后的参与者
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView<'a> {
    #[serde(flatten)]
    pub event: &'a ViolenceEvent,
    pub actors: Vec<InvolvedActor<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse<'a> {
    pub threat: ThreatStats,
    pub event_severity: ThreatStats,
    pub quick: QuickStats,
    pub weapon_types: Vec<Share>,
    pub weapon_type_mix: Vec<Share>,
    pub actor_weapons: Vec<Share>,
    pub behavior_mix: Vec<Share>,
    pub radar: Vec<RadarPoint>,
    pub time_series: &'a [TimeSeriesPoint],
}

/// 字幕流视图：状态 + 可见前缀 + 进度读数
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView<'a> {
    #[serde(flatten)]
    pub state: SequencerState,
    /// 例如 "00:12 / 04:30"
    pub elapsed: String,
    /// 例如 "F0360 / 8100"
    pub frame: String,
    pub period_ms: u64,
    pub captions: &'a [Caption],
}

impl<'a> FeedView<'a> {
    pub fn new(store: &'a FixtureStore, seq: &Sequencer, period: Duration) -> Self {
        let captions = seq.visible(store.captions());
        let scene = store.scene();
        let (timestamp, frame_num) = store
            .captions()
            .get(seq.cursor())
            .map(|c| (c.timestamp.as_str(), c.frame_num))
            .unwrap_or(("00:00", 0));

        Self {
            state: seq.snapshot(),
            elapsed: format!("{} / {}", timestamp, scene.clip_length),
            frame: format!("F{:04} / {}", frame_num, scene.total_frames),
            period_ms: period.as_millis() as u64,
            captions,
        }
    }
}

// ==========================================
// 3. API 路由构建
// ==========================================
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/dataset", get(get_dataset))
        .route("/api/scene", get(get_scene))
        .route("/api/actors", get(list_actors))
        .route("/api/actors/{id}", get(get_actor))
        .route("/api/events", get(list_events))
        .route("/api/events/{id}", get(get_event))
        .route("/api/predictions", get(list_predictions))
        .route("/api/weapons", get(list_weapons))
        .route("/api/analytics", get(get_analytics))
        .route("/api/feed", get(get_feed))
        .route("/api/feed/stream", get(feed_stream))
        .route("/api/feed/start", post(feed_start))
        .route("/api/feed/stop", post(feed_stop))
        .route("/api/feed/toggle", post(feed_toggle))
        .route("/api/feed/restart", post(feed_restart))
        .route("/api/feed/show-all", post(feed_show_all))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()) // ⚠️ 前端单独部署：允许所有跨域
        .with_state(state)
}

// ==========================================
// 4. 处理函数 (Handlers)
// ==========================================

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        dataset: state.store.id().as_str(),
        feed: state.playback.state().await,
        timer_live: state.playback.timer_live().await,
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// 接口：完整数据集
///
/// 数据集编译期就固定了，用原始 JSON 的指纹做强 ETag，命中直接 304。
async fn get_dataset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let fp = state.store.fingerprint();
    let etag = fingerprint::etag(fp);

    let hit = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| fingerprint::if_none_match_hits(v, fp));

    if hit {
        tracing::debug!("🗂️ 数据集未变化 (304)");
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }

    ([(header::ETAG, etag)], Json(state.store.dataset())).into_response()
}

async fn get_scene(State(state): State<Arc<AppState>>) -> Response {
    let store = &state.store;
    Json(SceneResponse {
        scene: store.scene(),
        captor: store.captor_info(),
        model: store.model_info(),
    })
    .into_response()
}

async fn list_actors(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<ActorFilter>, QueryRejection>,
) -> AppResult<Json<Vec<Actor>>> {
    let Query(filter) = filter?;
    let actors = match filter.threat {
        Some(level) => state.store.actors_with_threat(level).cloned().collect(),
        None => state.store.actors().to_vec(),
    };
    Ok(Json(actors))
}

async fn get_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Actor>> {
    let actor = state
        .store
        .actor(&id)
        .ok_or_else(|| AppError::NotFound(format!("Actor {}", id)))?;

    Ok(Json(actor.clone()))
}

async fn list_events(State(state): State<Arc<AppState>>) -> Response {
    let store = &state.store;
    let views: Vec<EventView<'_>> = store
        .events()
        .iter()
        .map(|event| EventView {
            event,
            actors: store.involved_actors(event),
        })
        .collect();

    Json(views).into_response()
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> AppResult<Response> {
    let store = &state.store;
    let event = store
        .event(id)
        .ok_or_else(|| AppError::NotFound(format!("Event {}", id)))?;

    Ok(Json(EventView {
        event,
        actors: store.involved_actors(event),
    })
    .into_response())
}

async fn list_predictions(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<PredictionFilter>, QueryRejection>,
) -> AppResult<Json<Vec<Prediction>>> {
    let Query(filter) = filter?;
    let predictions = match filter.risk {
        Some(level) => state.store.predictions_with_risk(level).cloned().collect(),
        None => state.store.predictions().to_vec(),
    };
    Ok(Json(predictions))
}

async fn list_weapons(State(state): State<Arc<AppState>>) -> Json<Vec<WeaponSummary>> {
    Json(state.store.weapons().to_vec())
}

/// 接口：图表数据
///
/// 每次请求都从完整集合重算。
async fn get_analytics(State(state): State<Arc<AppState>>) -> Response {
    let store = &state.store;

    Json(AnalyticsResponse {
        threat: analytics::threat_stats(store.actors()),
        event_severity: analytics::event_severity_stats(store.events()),
        quick: analytics::quick_stats(store),
        weapon_types: analytics::weapon_type_breakdown(store.weapons()),
        weapon_type_mix: analytics::chart_shares(store.weapon_type_mix()),
        actor_weapons: analytics::actor_weapon_breakdown(store.actors()),
        behavior_mix: analytics::chart_shares(store.behavior_mix()),
        radar: analytics::model_radar(store.model_info()),
        time_series: store.time_series(),
    })
    .into_response()
}

async fn get_feed(State(state): State<Arc<AppState>>) -> Response {
    let seq = state.playback.sequencer().await;
    feed_response(&state, &seq)
}

/// 接口：字幕流推送 (SSE)
///
/// 连上先推一次当前状态，之后每次变化（控制操作或定时 tick）推一条 `FeedView`。
async fn feed_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let updates = state.playback.subscribe();
    tracing::debug!("📡 新的字幕流订阅");

    let stream = WatchStream::new(updates).map(move |seq| {
        let view = FeedView::new(&state.store, &seq, state.playback.period());
        Event::default().event("feed").json_data(view)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn feed_start(State(state): State<Arc<AppState>>) -> Response {
    let seq = state.playback.start().await;
    tracing::info!(revealed = seq.revealed(), playing = seq.is_playing(), "▶️ 字幕流 start");
    feed_response(&state, &seq)
}

async fn feed_stop(State(state): State<Arc<AppState>>) -> Response {
    let seq = state.playback.stop().await;
    tracing::info!(revealed = seq.revealed(), "⏸️ 字幕流 stop");
    feed_response(&state, &seq)
}

async fn feed_toggle(State(state): State<Arc<AppState>>) -> Response {
    let seq = state.playback.toggle().await;
    tracing::info!(revealed = seq.revealed(), playing = seq.is_playing(), "⏯️ 字幕流 toggle");
    feed_response(&state, &seq)
}

async fn feed_restart(State(state): State<Arc<AppState>>) -> Response {
    let seq = state.playback.restart().await;
    tracing::info!("🔁 字幕流 restart");
    feed_response(&state, &seq)
}

async fn feed_show_all(State(state): State<Arc<AppState>>) -> Response {
    let seq = state.playback.show_all().await;
    tracing::info!(total = seq.total(), "⏭️ 字幕流 show-all");
    feed_response(&state, &seq)
}

fn feed_response(state: &AppState, seq: &Sequencer) -> Response {
    Json(FeedView::new(&state.store, seq, state.playback.period())).into_response()
}
