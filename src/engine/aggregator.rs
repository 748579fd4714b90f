// ==========================================
// SMART CALDA - O.S. 聚合引擎
// ==========================================
// 职责: 按 O.S. 编码分组，计算目标量 / 已送达量 / 进度
// 红线: 分组键全局唯一口径（osCode 优先，空则取 id）
// 红线: 已送达量按车次 id 去重后求和
// ==========================================

use crate::domain::operation::{ServiceOrderLine, Trip};
use std::collections::{HashMap, HashSet};

// ==========================================
// OsGroup - O.S. 分组（派生视图，不落库）
// ==========================================
#[derive(Debug, Clone)]
pub struct OsGroup<'a> {
    pub key: &'a str,
    /// 保持原始出现顺序，首行为主行
    pub lines: Vec<&'a ServiceOrderLine>,
}

impl<'a> OsGroup<'a> {
    /// 主行（承载 O.S. 级标量字段）
    pub fn primary(&self) -> &'a ServiceOrderLine {
        self.lines[0]
    }

    /// 展开所有行的车次，按 id 去重（保留首次出现）
    pub fn trips(&self) -> Vec<&'a Trip> {
        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut trips = Vec::new();
        for line in self.lines.iter().copied() {
            for trip in &line.volumes {
                if seen.insert(trip.id.as_str()) {
                    trips.push(trip);
                }
            }
        }
        trips
    }

    pub fn has_trips(&self) -> bool {
        self.lines.iter().any(|line| !line.volumes.is_empty())
    }
}

/// O.S. 汇总数值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupTotals {
    pub target_volume: f64,
    pub realized_volume: f64,
    pub progress_percent: f64,
    pub trip_count: usize,
}

// ==========================================
// OperationAggregator - 聚合引擎
// ==========================================
pub struct OperationAggregator {
    // 无状态引擎
}

impl OperationAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 按 O.S. 分组，组序为首次出现顺序，组内保持输入顺序
    pub fn group_by_os_code<'a>(&self, lines: &'a [ServiceOrderLine]) -> Vec<OsGroup<'a>> {
        let mut positions: HashMap<&'a str, usize> = HashMap::new();
        let mut groups: Vec<OsGroup<'a>> = Vec::new();

        for line in lines {
            let key = line.group_key();
            match positions.get(key) {
                Some(&pos) => groups[pos].lines.push(line),
                None => {
                    positions.insert(key, groups.len());
                    groups.push(OsGroup {
                        key,
                        lines: vec![line],
                    });
                }
            }
        }

        groups
    }

    /// 目标量：主行药罐总量 > 0 时取之，否则各产品行 target_volume 求和
    pub fn target_volume(&self, group: &OsGroup<'_>) -> f64 {
        match group.primary().application_total_volume {
            Some(tank_total) if tank_total > 0.0 => tank_total,
            _ => group.lines.iter().map(|line| line.target_volume).sum(),
        }
    }

    /// 已送达量（按车次 id 去重）
    pub fn realized_volume(&self, group: &OsGroup<'_>) -> f64 {
        group
            .trips()
            .into_iter()
            .filter(|trip| trip.is_delivered())
            .map(|trip| trip.liters)
            .sum()
    }

    /// 进度百分比，恒在 [0, 100]
    pub fn progress_percent(&self, group: &OsGroup<'_>) -> f64 {
        progress_of(self.realized_volume(group), self.target_volume(group))
    }

    pub fn totals(&self, group: &OsGroup<'_>) -> GroupTotals {
        let target_volume = self.target_volume(group);
        let realized_volume = self.realized_volume(group);
        GroupTotals {
            target_volume,
            realized_volume,
            progress_percent: progress_of(realized_volume, target_volume),
            trip_count: group.trips().len(),
        }
    }
}

impl Default for OperationAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn progress_of(realized: f64, target: f64) -> f64 {
    if !(target.is_finite() && target > 0.0) || !realized.is_finite() {
        return 0.0;
    }
    (realized / target * 100.0).clamp(0.0, 100.0)
}
