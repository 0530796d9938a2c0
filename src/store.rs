//! 模块：夹具仓库 (Fixture Store)
//!
//! **职责**: 持有一份完整的数据集，启动时加载一次，之后整个进程生命周期只读。
//!
//! - **数据来源**: `data/*.json`，用 `include_str!` 编译进二进制，不读磁盘、不走网络。
//! - **选择时机**: 构建期。默认 Shang-Chi，打开 `oldboy` feature 换成 Oldboy。
//!   两份夹具都会编译进来，测试可以按 `DatasetId` 分别加载。
//! - **没有校验层**: 夹具里的不一致（比如 frameNum 倒退）属于数据编写缺陷，原样展示。
//!   唯一的结构性检查是字幕不能为空，因为字幕序列器的取值范围是 `[1, N]`。

use serde::Serialize;

use crate::fingerprint;
use crate::fixture::{
    Actor, ChartSlice, Caption, CaptorInfo, Dataset, ModelInfo, Prediction, Scene, ThreatLevel,
    TimeSeriesPoint, ViolenceEvent, WeaponSummary,
};

/// 编译进来的两份数据集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetId {
    ShangChi,
    Oldboy,
}

impl DatasetId {
    /// 本次构建选中的数据集
    #[cfg(not(feature = "oldboy"))]
    pub const BUILD: DatasetId = DatasetId::ShangChi;
    #[cfg(feature = "oldboy")]
    pub const BUILD: DatasetId = DatasetId::Oldboy;

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetId::ShangChi => "shangchi",
            DatasetId::Oldboy => "oldboy",
        }
    }

    /// 原始 JSON 文本
    pub fn source(self) -> &'static str {
        match self {
            DatasetId::ShangChi => include_str!("../data/shangchi.json"),
            DatasetId::Oldboy => include_str!("../data/oldboy.json"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// 夹具 JSON 与类型定义不一致
    #[error("failed to decode {dataset} fixture: {source}")]
    Decode {
        dataset: &'static str,
        source: serde_json::Error,
    },
    /// 字幕序列为空，序列器无法建立 `[1, N]` 区间
    #[error("{0} fixture has no captions")]
    NoCaptions(&'static str),
}

/// 事件里某个参与者的解析结果
///
/// `name` 为 `None` 表示 id 悬空（数据集里没有这个 Actor），前端只显示 id。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvolvedActor<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
}

/// 夹具仓库
pub struct FixtureStore {
    id: DatasetId,
    dataset: Dataset,

    /// 原始 JSON 字节的 SHA-256，作为强 ETag
    fingerprint: String,
}

impl FixtureStore {
    /// 加载本次构建选中的数据集
    pub fn active() -> Result<Self, FixtureError> {
        Self::load(DatasetId::BUILD)
    }

    /// 按 id 加载编译进来的数据集
    pub fn load(id: DatasetId) -> Result<Self, FixtureError> {
        Self::from_json(id, id.source())
    }

    /// 从任意 JSON 文本构建（测试里用来喂畸形数据）
    pub fn from_json(id: DatasetId, raw: &str) -> Result<Self, FixtureError> {
        let dataset: Dataset = serde_json::from_str(raw).map_err(|source| FixtureError::Decode {
            dataset: id.as_str(),
            source,
        })?;

        if dataset.captions.is_empty() {
            return Err(FixtureError::NoCaptions(id.as_str()));
        }

        Ok(Self {
            id,
            fingerprint: fingerprint::dataset_fingerprint(raw.as_bytes()),
            dataset,
        })
    }

    pub fn id(&self) -> DatasetId {
        self.id
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn scene(&self) -> &Scene {
        &self.dataset.scene
    }

    pub fn actors(&self) -> &[Actor] {
        &self.dataset.actors
    }

    pub fn events(&self) -> &[ViolenceEvent] {
        &self.dataset.violence_events
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.dataset.predictions
    }

    pub fn captions(&self) -> &[Caption] {
        &self.dataset.captions
    }

    pub fn weapons(&self) -> &[WeaponSummary] {
        &self.dataset.weapon_summary
    }

    pub fn model_info(&self) -> &ModelInfo {
        &self.dataset.model_info
    }

    pub fn captor_info(&self) -> &CaptorInfo {
        &self.dataset.captor_info
    }

    pub fn time_series(&self) -> &[TimeSeriesPoint] {
        &self.dataset.time_series
    }

    pub fn behavior_mix(&self) -> &[ChartSlice] {
        &self.dataset.behavior_mix
    }

    pub fn weapon_type_mix(&self) -> &[ChartSlice] {
        &self.dataset.weapon_type_mix
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.dataset.actors.iter().find(|a| a.id == id)
    }

    pub fn event(&self, id: u32) -> Option<&ViolenceEvent> {
        self.dataset.violence_events.iter().find(|e| e.id == id)
    }

    /// 按威胁等级过滤，保持编写顺序
    pub fn actors_with_threat(&self, level: ThreatLevel) -> impl Iterator<Item = &Actor> {
        self.dataset
            .actors
            .iter()
            .filter(move |a| a.threat_level == level)
    }

    pub fn predictions_with_risk(&self, level: ThreatLevel) -> impl Iterator<Item = &Prediction> {
        self.dataset
            .predictions
            .iter()
            .filter(move |p| p.risk_level == level)
    }

    /// 解析事件的参与者列表
    ///
    /// 查不到的 id 不是错误，只是没有名字。
    pub fn involved_actors<'a>(&'a self, event: &'a ViolenceEvent) -> Vec<InvolvedActor<'a>> {
        event
            .involved_actors
            .iter()
            .map(|id| InvolvedActor {
                id: id.as_str(),
                name: self.actor(id).map(|a| a.name.as_str()),
            })
            .collect()
    }
}
