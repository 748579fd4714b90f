// ==========================================
// SMART CALDA - 日报引擎
// ==========================================
// 职责: 按交付日期汇总各 O.S. 实际施用量，并与推荐流量比对
// 输入: O.S. 分组 + 主数据名称目录 + 报表日期
// 输出: 日报明细与汇总（排版由展示层负责）
// ==========================================

use crate::engine::aggregator::OsGroup;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 施用偏差告警阈值（百分比）
pub const DEFAULT_RATE_DEVIATION_PCT: f64 = 10.0;

/// 主数据名称目录（id → 名称）
#[derive(Debug, Clone, Default)]
pub struct NameDirectory {
    pub locations: HashMap<String, String>,
    pub supervisors: HashMap<String, String>,
    pub resources: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReportEntry {
    pub os_code: String,
    pub location_id: String,
    pub sector_name: Option<String>,
    pub supervisor_name: Option<String>,
    /// 产品名称（按行顺序，缺名称时用产品 id）
    pub products: Vec<String>,
    /// 施用面积 (ha)
    pub area: f64,
    /// 推荐流量 (L/ha)
    pub recommended_rate: f64,
    /// 实际流量 (L/ha)
    pub applied_rate: f64,
    /// 当日送达量 (L)
    pub delivered_volume: f64,
    /// 偏差百分比（推荐流量为 0 时为 0）
    pub deviation_pct: f64,
    pub flagged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReportSummary {
    pub total_sectors: usize,
    pub total_area: f64,
    pub total_volume: f64,
    pub flagged_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub report_date: NaiveDate,
    pub entries: Vec<DailyReportEntry>,
    pub summary: DailyReportSummary,
}

impl DailyReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==========================================
// DailyReportEngine - 日报引擎
// ==========================================
pub struct DailyReportEngine {
    deviation_threshold_pct: f64,
}

impl DailyReportEngine {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_RATE_DEVIATION_PCT)
    }

    pub fn with_threshold(deviation_threshold_pct: f64) -> Self {
        Self {
            deviation_threshold_pct,
        }
    }

    /// 生成指定日期的日报
    ///
    /// 仅包含当日有已送达车次的 O.S.；无数据时返回空日报（非错误）
    pub fn build(
        &self,
        groups: &[OsGroup<'_>],
        directory: &NameDirectory,
        report_date: NaiveDate,
    ) -> DailyReport {
        let entries: Vec<DailyReportEntry> = groups
            .iter()
            .filter_map(|group| self.build_entry(group, directory, report_date))
            .collect();

        let summary = DailyReportSummary {
            total_sectors: entries
                .iter()
                .map(|e| e.location_id.as_str())
                .collect::<HashSet<_>>()
                .len(),
            total_area: entries.iter().map(|e| e.area).sum(),
            total_volume: entries.iter().map(|e| e.applied_rate * e.area).sum(),
            flagged_count: entries.iter().filter(|e| e.flagged).count(),
        };

        DailyReport {
            report_date,
            entries,
            summary,
        }
    }

    fn build_entry(
        &self,
        group: &OsGroup<'_>,
        directory: &NameDirectory,
        report_date: NaiveDate,
    ) -> Option<DailyReportEntry> {
        let delivered_today: Vec<f64> = group
            .trips()
            .into_iter()
            .filter(|t| t.is_delivered() && t.delivery_date == Some(report_date))
            .map(|t| t.liters)
            .collect();
        if delivered_today.is_empty() {
            return None;
        }

        let primary = group.primary();
        let area = primary
            .application_area
            .filter(|a| *a > 0.0)
            .unwrap_or(primary.production_area)
            .max(0.0);
        let recommended_rate = primary.application_flow_rate.unwrap_or(0.0).max(0.0);
        let delivered_volume: f64 = delivered_today.iter().sum();
        let applied_rate = if area > 0.0 { delivered_volume / area } else { 0.0 };
        let deviation_pct = if recommended_rate > 0.0 {
            (applied_rate / recommended_rate - 1.0) * 100.0
        } else {
            0.0
        };

        let products = group
            .lines
            .iter()
            .map(|line| {
                directory
                    .resources
                    .get(&line.resource_id)
                    .cloned()
                    .or_else(|| line.resource_name.clone().filter(|n| !n.is_empty()))
                    .unwrap_or_else(|| line.resource_id.clone())
            })
            .collect();

        Some(DailyReportEntry {
            os_code: group.key.to_string(),
            location_id: primary.location_id.clone(),
            sector_name: directory.locations.get(&primary.location_id).cloned(),
            supervisor_name: directory.supervisors.get(&primary.supervisor_id).cloned(),
            products,
            area,
            recommended_rate,
            applied_rate,
            delivered_volume,
            deviation_pct,
            flagged: deviation_pct.abs() > self.deviation_threshold_pct,
        })
    }
}

impl Default for DailyReportEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::{ServiceOrderLine, Trip};
    use crate::domain::types::TripStatus;
    use crate::engine::aggregator::OperationAggregator;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn trip(id: &str, liters: f64, status: TripStatus, date: NaiveDate) -> Trip {
        Trip {
            id: id.to_string(),
            liters,
            timestamp: Utc::now(),
            status,
            delivery_date: Some(date),
            delivery_shift: None,
        }
    }

    fn line(os: &str, location: &str, area: f64, rate: f64, trips: Vec<Trip>) -> ServiceOrderLine {
        let mut line = ServiceOrderLine::new(format!("{}-R1", os), os);
        line.location_id = location.to_string();
        line.resource_id = "R1".to_string();
        line.production_area = area;
        line.application_area = Some(area);
        line.application_flow_rate = Some(rate);
        line.volumes = trips;
        line
    }

    #[test]
    fn test_report_flags_deviation() {
        let lines = vec![
            // 10 ha × 100 L/ha，当日送达 1000 L → 偏差 0
            line("A", "S1", 10.0, 100.0, vec![
                trip("a1", 600.0, TripStatus::Delivered, day(10)),
                trip("a2", 400.0, TripStatus::Delivered, day(10)),
                trip("a3", 500.0, TripStatus::Delivered, day(11)),
            ]),
            // 10 ha × 100 L/ha，当日送达 1500 L → 偏差 +50%
            line("B", "S2", 10.0, 100.0, vec![trip("b1", 1500.0, TripStatus::Delivered, day(10))]),
            // 当日仅有未送达车次
            line("C", "S3", 5.0, 100.0, vec![trip("c1", 500.0, TripStatus::Available, day(10))]),
        ];
        let groups = OperationAggregator::new().group_by_os_code(&lines);
        let mut directory = NameDirectory::default();
        directory.resources.insert("R1".to_string(), "Herbicida X".to_string());

        let report = DailyReportEngine::new().build(&groups, &directory, day(10));

        assert_eq!(report.entries.len(), 2);
        let a = &report.entries[0];
        assert_eq!(a.delivered_volume, 1000.0);
        assert!((a.deviation_pct).abs() < 1e-9);
        assert!(!a.flagged);
        assert_eq!(a.products, vec!["Herbicida X".to_string()]);

        let b = &report.entries[1];
        assert!((b.deviation_pct - 50.0).abs() < 1e-9);
        assert!(b.flagged);

        assert_eq!(report.summary.total_sectors, 2);
        assert_eq!(report.summary.total_area, 20.0);
        assert!((report.summary.total_volume - 2500.0).abs() < 1e-9);
        assert_eq!(report.summary.flagged_count, 1);
    }

    #[test]
    fn test_report_empty_for_date_without_deliveries() {
        let lines = vec![line("A", "S1", 10.0, 100.0, vec![])];
        let groups = OperationAggregator::new().group_by_os_code(&lines);
        let report = DailyReportEngine::new().build(&groups, &NameDirectory::default(), day(1));
        assert!(report.is_empty());
        assert_eq!(report.summary, DailyReportSummary::default());
    }
}
