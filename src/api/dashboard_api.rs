// ==========================================
// SMART CALDA - 驾驶舱 API
// ==========================================
// 职责: O.S. 分组概览、分类列表筛选、图表数据、施用日报
// 架构: API 层 → Engine 层（聚合 / 分类 / 指标 / 日报），每次读取重新计算
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, DashboardSettings};
use crate::domain::operation::ServiceOrderLine;
use crate::domain::types::{normalize_text, OsCategory};
use crate::engine::{
    ClassificationEngine, ClassifiedGroup, CountEntry, DailyReport, DailyReportEngine,
    LiquidTotals, MetricsAggregator, NameDirectory, OperationAggregator, SupervisorSeries,
};
use crate::repository::repositories::EntityRepositories;

/// 分类计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    pub no_data: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub total: usize,
}

/// 各分类下的 O.S. 键
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryKeys {
    pub no_data: Vec<String>,
    pub in_progress: Vec<String>,
    pub completed: Vec<String>,
}

/// 单个 O.S. 分组摘要（主行字段 + 汇总值 + 分类）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub key: String,
    pub os_code: String,
    pub operation_number: String,
    pub operation_description: String,
    pub issue_date: String,
    pub os_situation: String,
    pub location_id: String,
    pub sector_name: Option<String>,
    pub supervisor_id: String,
    pub supervisor_name: Option<String>,
    pub line_count: usize,
    pub trip_count: usize,
    pub target_volume: f64,
    pub realized_volume: f64,
    pub progress_percent: f64,
    pub category: OsCategory,
}

/// 驾驶舱概览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub counts: CategoryCounts,
    pub keys: CategoryKeys,
    pub liquid: LiquidTotals,
    pub operation_types: Vec<CountEntry>,
    pub supervisors: Vec<SupervisorSeries>,
    pub groups: Vec<GroupSummary>,
}

/// 列表筛选条件（均为忽略大小写的子串匹配，空串不参与筛选）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupFilter {
    pub os_code: Option<String>,
    pub sector_name: Option<String>,
    pub operation_number: Option<String>,
    pub supervisor_name: Option<String>,
}

impl GroupFilter {
    fn matches(&self, summary: &GroupSummary) -> bool {
        contains(&self.os_code, &summary.key)
            && contains(
                &self.sector_name,
                summary.sector_name.as_deref().unwrap_or(&summary.location_id),
            )
            && contains(&self.operation_number, &summary.operation_number)
            && contains(
                &self.supervisor_name,
                summary.supervisor_name.as_deref().unwrap_or(&summary.supervisor_id),
            )
    }
}

fn contains(needle: &Option<String>, haystack: &str) -> bool {
    match needle.as_deref().map(normalize_text) {
        Some(needle) if !needle.is_empty() => normalize_text(haystack).contains(&needle),
        _ => true,
    }
}

// ==========================================
// DashboardApi - 驾驶舱 API
// ==========================================
pub struct DashboardApi {
    repos: EntityRepositories,
    config: Arc<ConfigManager>,
    aggregator: OperationAggregator,
    metrics: MetricsAggregator,
}

impl DashboardApi {
    pub fn new(repos: EntityRepositories, config: Arc<ConfigManager>) -> Self {
        Self {
            repos,
            config,
            aggregator: OperationAggregator::new(),
            metrics: MetricsAggregator::new(),
        }
    }

    /// 驾驶舱概览：计数、键列表、药液总量、两张图表、分组摘要
    #[instrument(skip(self))]
    pub fn overview(&self) -> ApiResult<DashboardOverview> {
        let settings = self.settings()?;
        let lines = self.repos.operations.list()?;
        let directory = self.name_directory()?;

        let classifier = ClassificationEngine::with_threshold(settings.completion_threshold);
        let classified = classifier.classify_all(self.aggregator.group_by_os_code(&lines));

        let mut counts = CategoryCounts {
            total: classified.len(),
            ..CategoryCounts::default()
        };
        let mut keys = CategoryKeys::default();
        for item in &classified {
            let key = item.group.key.to_string();
            match item.category {
                OsCategory::NoData => {
                    counts.no_data += 1;
                    keys.no_data.push(key);
                }
                OsCategory::InProgress => {
                    counts.in_progress += 1;
                    keys.in_progress.push(key);
                }
                OsCategory::Completed => {
                    counts.completed += 1;
                    keys.completed.push(key);
                }
            }
        }

        let overview = DashboardOverview {
            counts,
            keys,
            liquid: self.metrics.liquid_totals(&classified),
            operation_types: self
                .metrics
                .operation_type_counts(&classified, settings.top_operation_types),
            supervisors: self
                .metrics
                .supervisor_series(&classified, &directory.supervisors),
            groups: classified
                .iter()
                .map(|item| self.summarize(item, &directory))
                .collect(),
        };

        debug!(
            total = overview.counts.total,
            completed = overview.counts.completed,
            "概览已生成"
        );
        Ok(overview)
    }

    /// 分类列表（category 为 None 时返回全部分组）
    pub fn list_groups(
        &self,
        category: Option<OsCategory>,
        filter: &GroupFilter,
    ) -> ApiResult<Vec<GroupSummary>> {
        let settings = self.settings()?;
        let lines = self.repos.operations.list()?;
        let directory = self.name_directory()?;

        let classifier = ClassificationEngine::with_threshold(settings.completion_threshold);
        let classified = classifier.classify_all(self.aggregator.group_by_os_code(&lines));

        Ok(classified
            .iter()
            .filter(|item| category.map_or(true, |c| item.category == c))
            .map(|item| self.summarize(item, &directory))
            .filter(|summary| filter.matches(summary))
            .collect())
    }

    /// 施用日报（无数据时返回空日报）
    #[instrument(skip(self))]
    pub fn daily_report(&self, report_date: NaiveDate) -> ApiResult<DailyReport> {
        let settings = self.settings()?;
        let lines: Vec<ServiceOrderLine> = self.repos.operations.list()?;
        let directory = self.name_directory()?;

        let groups = self.aggregator.group_by_os_code(&lines);
        let report = DailyReportEngine::with_threshold(settings.rate_deviation_pct)
            .build(&groups, &directory, report_date);

        debug!(entries = report.entries.len(), "日报已生成");
        Ok(report)
    }

    fn settings(&self) -> ApiResult<DashboardSettings> {
        self.config
            .get_dashboard_settings()
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    fn name_directory(&self) -> ApiResult<NameDirectory> {
        let to_map = |pairs: Vec<(String, String)>| -> HashMap<String, String> {
            pairs.into_iter().collect()
        };

        Ok(NameDirectory {
            locations: to_map(
                self.repos
                    .locations
                    .list()?
                    .into_iter()
                    .map(|l| (l.id, l.sector_name))
                    .collect(),
            ),
            supervisors: to_map(
                self.repos
                    .supervisors
                    .list()?
                    .into_iter()
                    .map(|s| (s.id, s.name))
                    .collect(),
            ),
            resources: to_map(
                self.repos
                    .resources
                    .list()?
                    .into_iter()
                    .map(|r| (r.id, r.name))
                    .collect(),
            ),
        })
    }

    fn summarize(&self, item: &ClassifiedGroup<'_>, directory: &NameDirectory) -> GroupSummary {
        let primary = item.group.primary();
        let totals = self.aggregator.totals(&item.group);

        GroupSummary {
            key: item.group.key.to_string(),
            os_code: primary.os_code.clone(),
            operation_number: primary.operation_number.clone(),
            operation_description: primary.operation_description.clone(),
            issue_date: primary.issue_date.clone(),
            os_situation: primary.os_situation.clone(),
            location_id: primary.location_id.clone(),
            sector_name: directory.locations.get(&primary.location_id).cloned(),
            supervisor_id: primary.supervisor_id.clone(),
            supervisor_name: directory.supervisors.get(&primary.supervisor_id).cloned(),
            line_count: item.group.lines.len(),
            trip_count: totals.trip_count,
            target_volume: totals.target_volume,
            realized_volume: totals.realized_volume,
            progress_percent: totals.progress_percent,
            category: item.category,
        }
    }
}
