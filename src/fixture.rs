use serde::{Deserialize, Serialize}; // 引入序列化库，夹具文件是 JSON，API 输出也是 JSON
use std::collections::BTreeMap;

// ==========================================
// 共享枚举
// ==========================================

/// 威胁 / 严重度 / 风险等级
///
/// Actor、ViolenceEvent、Prediction 共用同一个四值序数枚举。
/// 变体的声明顺序就是序数顺序：`Low < Medium < High < Critical`，
/// 所以 derive 出来的 `Ord` 可以直接用于排序和取最大值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponType {
    Blunt,
    Edged,
    None,
    Environmental,
}

impl WeaponType {
    pub fn as_str(self) -> &'static str {
        match self {
            WeaponType::Blunt => "blunt",
            WeaponType::Edged => "edged",
            WeaponType::None => "none",
            WeaponType::Environmental => "environmental",
        }
    }
}

/// 字幕类别，前端据此上色（violence 红、weapon 橙 ...）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionKind {
    Violence,
    Weapon,
    Movement,
    Prediction,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DangerLevel {
    #[serde(rename = "Low-Medium")]
    LowMedium,
    Medium,
    High,
    Critical,
}

// ==========================================
// 实体记录
// ==========================================

/// 画面百分比坐标系下的轴对齐包围盒 (0..100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    // === 身份 ===
    pub id: String,
    pub name: String,

    // === 分类 ===
    pub role: String,
    pub label: String,

    // === 装备 ===
    pub weapon: String,
    pub weapon_type: WeaponType,

    pub behavior: String,
    pub threat_level: ThreatLevel,

    /// 0.0 到 1.0，只用于展示
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    pub skeletal_status: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolenceEvent {
    /// 时间线顺序编号，数据集内唯一
    pub id: u32,
    pub timestamp: String,
    pub frame_range: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: ThreatLevel,
    pub description: String,
    /// 对 Actor.id 的弱引用：找不到对应 Actor 的 id 照样展示，只是没有名字
    pub involved_actors: Vec<String>,
    pub weapons_used: Vec<String>,
    pub caption_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub timestamp: String,
    /// 自由文本标签（例如 "BUS STRUCTURE"），不是严格的 Actor.id
    pub actor: String,
    pub current_action: String,
    pub predicted_next_move: String,
    pub confidence: f32,
    pub lstm_output: String,
    pub risk_level: ThreatLevel,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub timestamp: String,
    pub frame_num: u32,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: CaptionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponSummary {
    pub weapon: String,
    pub count: u32,
    /// 仅供参考：长度不一定等于 count，也不保证都是完整的 Actor.id
    pub holders: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub danger_level: DangerLevel,
    pub status: String,
}

/// 模型指标：纯装饰性的常量，不是算出来的
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub framework: String,
    pub detection_model: String,
    pub tracking_model: String,
    pub prediction_model: String,
    pub skeletal_model: String,
    pub input_resolution: String,
    #[serde(rename = "processingFPS")]
    pub processing_fps: String,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1_score: f32,
    #[serde(rename = "weaponDetectionAP")]
    pub weapon_detection_ap: f32,
    pub pose_estimation_accuracy: f32,
    #[serde(rename = "violencePredictionAUC")]
    pub violence_prediction_auc: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptorInfo {
    pub video_source: String,
    pub director: String,
    pub cinematographer: String,
    pub capture_type: String,
    pub original_resolution: String,
    pub processed_resolution: String,
    pub duration: String,
    pub total_frames: String,
    pub fps: u32,
    pub camera_angle: String,
    pub simulated_captor: String,
    pub location: String,
    #[serde(rename = "processingFPS", default, skip_serializing_if = "Option::is_none")]
    pub processing_fps: Option<String>,
}

/// 时间序列采样点
///
/// 两个数据集共有的五条曲线是固定字段；各自特有的曲线
/// （Shang-Chi 的 structuralIntegrity / razorFistVelocity）落进 `extra`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub time: String,
    pub violence: f32,
    pub threat: f32,
    pub fatigue: f32,
    pub mob_cohesion: f32,
    pub actors_active: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, f32>,
}

/// 编写好的图表切片（饼图 / 条形图），数值原样展示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSlice {
    pub name: String,
    pub value: u32,
}

/// 外部视频播放器的定位符。核心从不读取它的播放进度。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoLocator {
    pub provider: String,
    pub locator: String,
}

/// 场景元数据 + 回放常量
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub title: String,
    pub setting: String,
    pub camera: String,
    pub video: Option<VideoLocator>,
    /// 进度读数分母，例如 "04:30"
    pub clip_length: String,
    pub total_frames: u32,
    /// 字幕揭示节拍（毫秒）
    pub caption_period_ms: u64,
    /// 预揭示条数，缺省时用序列器的默认值
    #[serde(default = "default_seed_captions")]
    pub seed_captions: usize,
}

fn default_seed_captions() -> usize {
    crate::sequencer::DEFAULT_SEED
}

/// 一份完整的数据集（对应 data/ 下的一个 JSON 文件）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub scene: Scene,
    pub actors: Vec<Actor>,
    pub violence_events: Vec<ViolenceEvent>,
    pub predictions: Vec<Prediction>,
    pub captions: Vec<Caption>,
    pub weapon_summary: Vec<WeaponSummary>,
    pub model_info: ModelInfo,
    pub captor_info: CaptorInfo,
    pub time_series: Vec<TimeSeriesPoint>,
    #[serde(default)]
    pub behavior_mix: Vec<ChartSlice>,
    /// 按具体武器划分的分布，和 weaponSummary 的 type 分组不是一回事
    #[serde(default)]
    pub weapon_type_mix: Vec<ChartSlice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_levels_are_ordinal() {
        assert!(ThreatLevel::Low < ThreatLevel::Medium);
        assert!(ThreatLevel::Medium < ThreatLevel::High);
        assert!(ThreatLevel::High < ThreatLevel::Critical);
        assert_eq!(
            [ThreatLevel::High, ThreatLevel::Critical, ThreatLevel::Low]
                .into_iter()
                .max(),
            Some(ThreatLevel::Critical)
        );
    }

    #[test]
    fn wire_names_follow_fixture_files() {
        let caption: Caption = serde_json::from_str(
            r#"{"timestamp":"00:12","frameNum":360,"text":"first strike","type":"violence"}"#,
        )
        .unwrap();
        assert_eq!(caption.kind, CaptionKind::Violence);
        assert_eq!(caption.frame_num, 360);

        let danger: DangerLevel = serde_json::from_str(r#""Low-Medium""#).unwrap();
        assert_eq!(danger, DangerLevel::LowMedium);
        assert_eq!(serde_json::to_string(&ThreatLevel::Critical).unwrap(), r#""critical""#);
    }

    #[test]
    fn scene_without_seed_uses_default() {
        let scene: Scene = serde_json::from_str(
            r#"{"id":"x","title":"t","setting":"s","camera":"c","video":null,
                "clipLength":"01:00","totalFrames":1800,"captionPeriodMs":2000}"#,
        )
        .unwrap();
        assert_eq!(scene.seed_captions, crate::sequencer::DEFAULT_SEED);
        assert!(scene.video.is_none());
    }

    #[test]
    fn time_series_extras_round_through_flatten() {
        let point: TimeSeriesPoint = serde_json::from_str(
            r#"{"time":"01:00","violence":95,"threat":98,"fatigue":15,"mobCohesion":82,
                "actorsActive":5,"structuralIntegrity":85,"razorFistVelocity":18}"#,
        )
        .unwrap();
        assert_eq!(point.actors_active, 5);
        assert_eq!(point.extra.get("structuralIntegrity"), Some(&85.0));
        assert_eq!(point.extra.len(), 2);

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["razorFistVelocity"], 18.0);
        assert_eq!(json["mobCohesion"], 82.0);
    }
}
