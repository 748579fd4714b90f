// ==========================================
// SMART CALDA - 指标/图表聚合引擎
// ==========================================
// 职责: 基于分类结果做只读汇总（作业类型 / 负责人 / 药液总量）
// 红线: 已送达量按车次 id 全局去重；"可用"仅统计 DISPONIVEL
// ==========================================

use crate::domain::types::TripStatus;
use crate::engine::aggregator::OperationAggregator;
use crate::engine::classification::ClassifiedGroup;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 无负责人时的展示标签
pub const UNASSIGNED_SUPERVISOR_LABEL: &str = "Não atribuído";

/// 作业类型图默认条目数
pub const DEFAULT_TOP_OPERATION_TYPES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
}

/// 负责人双序列（活跃 vs 已完成）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorSeries {
    pub supervisor_id: String,
    pub label: String,
    pub active: usize,
    pub closed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidTotals {
    /// 计划总量（各 O.S. 目标量之和）
    pub programmed: f64,
    /// 已送达（车次去重）
    pub delivered: f64,
    /// 待运输（仅 DISPONIVEL）
    pub available: f64,
}

// ==========================================
// MetricsAggregator - 指标聚合
// ==========================================
pub struct MetricsAggregator {
    aggregator: OperationAggregator,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self {
            aggregator: OperationAggregator::new(),
        }
    }

    /// 活跃 O.S.（NO_DATA ∪ IN_PROGRESS）按作业编号计数，降序取前 N
    ///
    /// 计数相同按编号升序
    pub fn operation_type_counts(&self, groups: &[ClassifiedGroup<'_>], top_n: usize) -> Vec<CountEntry> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for classified in groups.iter().filter(|g| g.category.is_active()) {
            let operation = classified.group.primary().operation_number.trim();
            *counts.entry(operation).or_insert(0) += 1;
        }

        let mut entries: Vec<CountEntry> = counts
            .into_iter()
            .map(|(label, count)| CountEntry {
                label: label.to_string(),
                count,
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        entries.truncate(top_n);
        entries
    }

    /// 负责人活跃/已完成双序列
    ///
    /// # 参数
    /// - supervisor_names: 负责人 id → 姓名；缺失时以 id 作为标签
    ///
    /// 顺序：按首次出现
    pub fn supervisor_series(
        &self,
        groups: &[ClassifiedGroup<'_>],
        supervisor_names: &HashMap<String, String>,
    ) -> Vec<SupervisorSeries> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut series: Vec<SupervisorSeries> = Vec::new();

        for classified in groups {
            let supervisor_id = classified.group.primary().supervisor_id.trim().to_string();
            let pos = match positions.get(&supervisor_id) {
                Some(&pos) => pos,
                None => {
                    let label = if supervisor_id.is_empty() {
                        UNASSIGNED_SUPERVISOR_LABEL.to_string()
                    } else {
                        supervisor_names
                            .get(&supervisor_id)
                            .filter(|name| !name.trim().is_empty())
                            .cloned()
                            .unwrap_or_else(|| supervisor_id.clone())
                    };
                    positions.insert(supervisor_id.clone(), series.len());
                    series.push(SupervisorSeries {
                        supervisor_id,
                        label,
                        active: 0,
                        closed: 0,
                    });
                    series.len() - 1
                }
            };

            if classified.category.is_active() {
                series[pos].active += 1;
            } else {
                series[pos].closed += 1;
            }
        }

        series
    }

    /// 计划 / 已送达 / 待运输 药液总量
    pub fn liquid_totals(&self, groups: &[ClassifiedGroup<'_>]) -> LiquidTotals {
        let mut totals = LiquidTotals::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for classified in groups {
            totals.programmed += self.aggregator.target_volume(&classified.group);

            for trip in classified.group.trips() {
                if !seen.insert(trip.id.as_str()) {
                    continue;
                }
                match trip.status {
                    TripStatus::Delivered => totals.delivered += trip.liters,
                    TripStatus::Available => totals.available += trip.liters,
                    TripStatus::Unknown => {}
                }
            }
        }

        totals
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
