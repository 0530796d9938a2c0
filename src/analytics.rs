//! 汇总统计
//!
//! 全部是对夹具集合的纯函数，每次请求都从完整集合重新算一遍，没有缓存。

use serde::Serialize;

use crate::fixture::{Actor, ChartSlice, ModelInfo, ThreatLevel, ViolenceEvent, WeaponSummary};
use crate::store::FixtureStore;

/// 按威胁等级计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThreatStats {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// 按等级计数一串威胁等级
pub fn tally<I>(levels: I) -> ThreatStats
where
    I: IntoIterator<Item = ThreatLevel>,
{
    let mut stats = ThreatStats::default();
    for level in levels {
        let slot = match level {
            ThreatLevel::Critical => &mut stats.critical,
            ThreatLevel::High => &mut stats.high,
            ThreatLevel::Medium => &mut stats.medium,
            ThreatLevel::Low => &mut stats.low,
        };
        *slot += 1;
    }
    stats
}

pub fn threat_stats(actors: &[Actor]) -> ThreatStats {
    tally(actors.iter().map(|a| a.threat_level))
}

/// 暴力事件按严重度计数（事件时间线顶部的统计卡片）
pub fn event_severity_stats(events: &[ViolenceEvent]) -> ThreatStats {
    tally(events.iter().map(|e| e.severity))
}

/// 饼图的一片
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub name: String,
    pub value: u32,
    /// 0..100；总量为 0 时全部为 0
    pub percent: f64,
}

/// 把 (名称, 数值) 列表换算成占比，保持输入顺序
pub fn shares<I, S>(slices: I) -> Vec<Share>
where
    I: IntoIterator<Item = (S, u32)>,
    S: Into<String>,
{
    let slices: Vec<(String, u32)> = slices.into_iter().map(|(n, v)| (n.into(), v)).collect();
    let total: u32 = slices.iter().map(|(_, v)| v).sum();

    slices
        .into_iter()
        .map(|(name, value)| Share {
            percent: if total == 0 {
                0.0
            } else {
                value as f64 / total as f64 * 100.0
            },
            name,
            value,
        })
        .collect()
}

/// 编写好的图表切片换算成占比
pub fn chart_shares(slices: &[ChartSlice]) -> Vec<Share> {
    shares(slices.iter().map(|s| (s.name.as_str(), s.value)))
}

/// 武器清单按 `type` 分组求和（首次出现顺序）
pub fn weapon_type_breakdown(weapons: &[WeaponSummary]) -> Vec<Share> {
    let mut groups: Vec<(&str, u32)> = Vec::new();
    for w in weapons {
        match groups.iter_mut().find(|(kind, _)| *kind == w.kind) {
            Some((_, count)) => *count += w.count,
            None => groups.push((w.kind.as_str(), w.count)),
        }
    }
    shares(groups)
}

/// 演员装备按 weaponType 分组计数（首次出现顺序）
pub fn actor_weapon_breakdown(actors: &[Actor]) -> Vec<Share> {
    let mut groups: Vec<(&'static str, u32)> = Vec::new();
    for a in actors {
        let kind = a.weapon_type.as_str();
        match groups.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, count)) => *count += 1,
            None => groups.push((kind, 1)),
        }
    }
    shares(groups)
}

pub fn peak_severity(events: &[ViolenceEvent]) -> Option<ThreatLevel> {
    events.iter().map(|e| e.severity).max()
}

/// 概览卡片
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub actors_tracked: usize,
    pub actors_active: usize,
    /// 武器清单 count 之和
    pub weapons_detected: u32,
    pub violence_events: usize,
    pub peak_severity: Option<ThreatLevel>,
    pub model_accuracy: f32,
}

pub fn quick_stats(store: &FixtureStore) -> QuickStats {
    QuickStats {
        actors_tracked: store.actors().len(),
        actors_active: store.actors().iter().filter(|a| a.is_active).count(),
        weapons_detected: store.weapons().iter().map(|w| w.count).sum(),
        violence_events: store.events().len(),
        peak_severity: peak_severity(store.events()),
        model_accuracy: store.model_info().accuracy,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarPoint {
    pub metric: &'static str,
    pub value: f32,
}

/// 雷达图：六个百分制指标（AUC 不在同一量纲，不放进来）
pub fn model_radar(info: &ModelInfo) -> Vec<RadarPoint> {
    vec![
        RadarPoint { metric: "Accuracy", value: info.accuracy },
        RadarPoint { metric: "Precision", value: info.precision },
        RadarPoint { metric: "Recall", value: info.recall },
        RadarPoint { metric: "F1 Score", value: info.f1_score },
        RadarPoint { metric: "Weapon AP", value: info.weapon_detection_ap },
        RadarPoint { metric: "Pose Est.", value: info.pose_estimation_accuracy },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DatasetId;

    #[test]
    fn threat_stats_match_literal_filters() {
        for id in [DatasetId::ShangChi, DatasetId::Oldboy] {
            let store = FixtureStore::load(id).unwrap();
            let literal = |level: ThreatLevel| {
                store
                    .actors()
                    .iter()
                    .filter(|a| a.threat_level == level)
                    .count()
            };
            assert_eq!(
                threat_stats(store.actors()),
                ThreatStats {
                    critical: literal(ThreatLevel::Critical),
                    high: literal(ThreatLevel::High),
                    medium: literal(ThreatLevel::Medium),
                    low: literal(ThreatLevel::Low),
                },
                "{:?}",
                id
            );
        }
    }

    #[test]
    fn event_severity_counts() {
        let store = FixtureStore::load(DatasetId::ShangChi).unwrap();
        assert_eq!(
            event_severity_stats(store.events()),
            ThreatStats { critical: 5, high: 2, medium: 1, low: 0 }
        );
        assert_eq!(event_severity_stats(&[]), ThreatStats::default());
    }

    #[test]
    fn weapon_type_mix_is_served_as_authored() {
        let store = FixtureStore::load(DatasetId::ShangChi).unwrap();
        let mix = chart_shares(store.weapon_type_mix());
        let names: Vec<(&str, u32)> = mix.iter().map(|s| (s.name.as_str(), s.value)).collect();
        assert_eq!(
            names,
            [
                ("Machete-Arm", 1),
                ("Karambit Knives", 2),
                ("Tactical/Concealed", 2),
                ("Bus Pole (Improv)", 1),
                ("Martial Arts", 2),
            ]
        );
        assert_eq!(mix[1].percent, 25.0);

        let oldboy = FixtureStore::load(DatasetId::Oldboy).unwrap();
        assert!(chart_shares(oldboy.weapon_type_mix()).is_empty());
    }

    #[test]
    fn shang_chi_threat_stats() {
        let store = FixtureStore::load(DatasetId::ShangChi).unwrap();
        assert_eq!(
            threat_stats(store.actors()),
            ThreatStats { critical: 3, high: 4, medium: 0, low: 5 }
        );
    }

    #[test]
    fn shares_sum_to_one_hundred() {
        let slices = shares([("a", 1u32), ("b", 1), ("c", 2)]);
        assert_eq!(slices[0].percent, 25.0);
        assert_eq!(slices[2].percent, 50.0);
        let total: f64 = slices.iter().map(|s| s.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn shares_of_nothing_are_zero_not_nan() {
        let slices = shares([("a", 0u32), ("b", 0)]);
        assert!(slices.iter().all(|s| s.percent == 0.0));
        assert!(shares(Vec::<(String, u32)>::new()).is_empty());
    }

    #[test]
    fn weapon_types_group_in_first_seen_order() {
        let store = FixtureStore::load(DatasetId::ShangChi).unwrap();
        let breakdown = weapon_type_breakdown(store.weapons());
        let names: Vec<(&str, u32)> = breakdown.iter().map(|s| (s.name.as_str(), s.value)).collect();
        assert_eq!(
            names,
            [
                ("Edged (Permanent)", 1),
                ("Edged (Concealed)", 4),
                ("Blunt (Environmental)", 1),
                ("Unarmed Combat", 2),
            ]
        );
    }

    #[test]
    fn actor_weapons_cover_every_actor() {
        let store = FixtureStore::load(DatasetId::Oldboy).unwrap();
        let breakdown = actor_weapon_breakdown(store.actors());
        let total: u32 = breakdown.iter().map(|s| s.value).sum();
        assert_eq!(total as usize, store.actors().len());
        assert_eq!(breakdown[0].name, "blunt");
    }

    #[test]
    fn quick_stats_for_shang_chi() {
        let store = FixtureStore::load(DatasetId::ShangChi).unwrap();
        let stats = quick_stats(&store);
        assert_eq!(stats.actors_tracked, 12);
        assert_eq!(stats.actors_active, 6);
        assert_eq!(stats.weapons_detected, 8);
        assert_eq!(stats.violence_events, 8);
        assert_eq!(stats.peak_severity, Some(ThreatLevel::Critical));
        assert_eq!(stats.model_accuracy, 95.2);
    }

    #[test]
    fn peak_severity_of_empty_timeline() {
        assert_eq!(peak_severity(&[]), None);
    }
}
