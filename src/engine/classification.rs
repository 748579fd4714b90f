// ==========================================
// SMART CALDA - O.S. 分类引擎
// ==========================================
// 职责: 将 O.S. 分组归入 NO_DATA / IN_PROGRESS / COMPLETED 之一
// 说明: 每次读取重新计算，无持久化状态迁移
// ==========================================

use crate::domain::types::OsCategory;
use crate::engine::aggregator::{OperationAggregator, OsGroup};

/// 完成阈值：已送达量 >= 目标量 × 阈值 视为完成
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.99;

const COMPARE_EPSILON: f64 = 1e-6;

/// 带分类结果的 O.S. 分组
#[derive(Debug, Clone)]
pub struct ClassifiedGroup<'a> {
    pub group: OsGroup<'a>,
    pub category: OsCategory,
}

// ==========================================
// ClassificationEngine - 分类引擎
// ==========================================
pub struct ClassificationEngine {
    completion_threshold: f64,
    aggregator: OperationAggregator,
}

impl ClassificationEngine {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_COMPLETION_THRESHOLD)
    }

    /// 指定完成阈值（非法值回退默认阈值）
    pub fn with_threshold(completion_threshold: f64) -> Self {
        let completion_threshold = if completion_threshold.is_finite() && completion_threshold > 0.0 {
            completion_threshold
        } else {
            tracing::warn!(
                threshold = completion_threshold,
                "完成阈值非法，回退默认值 {}",
                DEFAULT_COMPLETION_THRESHOLD
            );
            DEFAULT_COMPLETION_THRESHOLD
        };
        Self {
            completion_threshold,
            aggregator: OperationAggregator::new(),
        }
    }

    pub fn completion_threshold(&self) -> f64 {
        self.completion_threshold
    }

    /// 分类规则
    ///
    /// 1) 无车次 → NO_DATA
    /// 2) 目标量 > 0 且 已送达量 >= 目标量 × 阈值 → COMPLETED
    /// 3) 其余 → IN_PROGRESS（目标量为 0 时永不完成）
    pub fn classify(&self, group: &OsGroup<'_>) -> OsCategory {
        if !group.has_trips() {
            return OsCategory::NoData;
        }
        let target = self.aggregator.target_volume(group);
        let realized = self.aggregator.realized_volume(group);
        self.classify_totals(realized, target)
    }

    /// 批量分类，保持分组顺序
    pub fn classify_all<'a>(&self, groups: Vec<OsGroup<'a>>) -> Vec<ClassifiedGroup<'a>> {
        groups
            .into_iter()
            .map(|group| {
                let category = self.classify(&group);
                ClassifiedGroup { group, category }
            })
            .collect()
    }

    /// 已知汇总值时直接分类（调用方须确保车次非空）
    pub fn classify_totals(&self, realized: f64, target: f64) -> OsCategory {
        if target > 0.0 && realized + COMPARE_EPSILON >= target * self.completion_threshold {
            OsCategory::Completed
        } else {
            OsCategory::InProgress
        }
    }
}

impl Default for ClassificationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::{ServiceOrderLine, Trip};
    use crate::domain::types::TripStatus;
    use chrono::Utc;

    fn group_lines(target: f64, delivered: &[f64], pending: &[f64]) -> Vec<ServiceOrderLine> {
        let mut line = ServiceOrderLine::new("os-1", "OS1");
        line.application_total_volume = Some(target);
        let mut counter = 0;
        let mut push = |liters: f64, status: TripStatus| {
            counter += 1;
            line.volumes.push(Trip {
                id: format!("t{}", counter),
                liters,
                timestamp: Utc::now(),
                status,
                delivery_date: None,
                delivery_shift: None,
            });
        };
        for l in delivered {
            push(*l, TripStatus::Delivered);
        }
        for l in pending {
            push(*l, TripStatus::Available);
        }
        vec![line]
    }

    fn classify_with(engine: &ClassificationEngine, lines: &[ServiceOrderLine]) -> OsCategory {
        let groups = OperationAggregator::new().group_by_os_code(lines);
        engine.classify(&groups[0])
    }

    #[test]
    fn test_no_trips_is_no_data() {
        let lines = group_lines(1000.0, &[], &[]);
        assert_eq!(classify_with(&ClassificationEngine::new(), &lines), OsCategory::NoData);
    }

    #[test]
    fn test_completion_threshold_tolerance() {
        let lines = group_lines(1000.0, &[990.0], &[10.0]);
        assert_eq!(
            classify_with(&ClassificationEngine::new(), &lines),
            OsCategory::Completed
        );
        assert_eq!(
            classify_with(&ClassificationEngine::with_threshold(1.0), &lines),
            OsCategory::InProgress
        );
    }

    #[test]
    fn test_below_threshold_is_in_progress() {
        let lines = group_lines(1000.0, &[500.0], &[500.0]);
        assert_eq!(
            classify_with(&ClassificationEngine::new(), &lines),
            OsCategory::InProgress
        );
    }

    #[test]
    fn test_zero_target_never_completes() {
        let lines = group_lines(0.0, &[100.0], &[]);
        assert_eq!(
            classify_with(&ClassificationEngine::new(), &lines),
            OsCategory::InProgress
        );
    }

    #[test]
    fn test_every_group_gets_exactly_one_category() {
        let mut lines = group_lines(1000.0, &[1000.0], &[]);
        lines.extend(group_lines(1000.0, &[], &[]).into_iter().map(|mut l| {
            l.id = "os-2".to_string();
            l.os_code = "OS2".to_string();
            l
        }));
        let groups = OperationAggregator::new().group_by_os_code(&lines);
        let classified = ClassificationEngine::new().classify_all(groups);
        assert_eq!(classified.len(), 2);
        assert_eq!(classified[0].category, OsCategory::Completed);
        assert_eq!(classified[1].category, OsCategory::NoData);
    }

    #[test]
    fn test_invalid_threshold_falls_back() {
        let engine = ClassificationEngine::with_threshold(f64::NAN);
        assert_eq!(engine.completion_threshold(), DEFAULT_COMPLETION_THRESHOLD);
    }
}
