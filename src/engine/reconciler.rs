// ==========================================
// SMART CALDA - 运输状态对账引擎
// ==========================================
// 职责: 将副表（按 O.S. 横向排列的车次状态）合并到生成的车次上
// 输入: 副表记录（已完成列映射）
// 输出: StatusIndex (osCode, 车次序号) → 状态；O.S. 药罐元数据
// 红线: 人工切换只在 ENTREGUE / DISPONIVEL 之间翻转
// ==========================================

use crate::domain::operation::Trip;
use crate::domain::types::TripStatus;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 副表单行（列映射后的结构化记录）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecondaryRecord {
    pub os_code: String,
    pub flow_rate: Option<f64>,
    pub tank_capacity: Option<f64>,
    /// (车次序号, 原始单元格文本)，空单元格不出现
    pub trip_cells: Vec<(u32, String)>,
}

/// O.S. 级药罐元数据
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TankMetadata {
    /// 药液流量 (L/ha)
    pub flow_rate: f64,
    /// 车辆罐容 (L)
    pub tank_capacity: f64,
}

// ==========================================
// StatusIndex - 车次状态索引
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StatusIndex {
    statuses: HashMap<(String, u32), TripStatus>,
    tanks: HashMap<String, TankMetadata>,
}

impl StatusIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入状态（同键后写覆盖前写）
    pub fn insert(&mut self, os_code: &str, ordinal: u32, status: TripStatus) {
        self.statuses
            .insert((os_code.trim().to_string(), ordinal), status);
    }

    pub fn get(&self, os_code: &str, ordinal: u32) -> Option<TripStatus> {
        self.statuses
            .get(&(os_code.trim().to_string(), ordinal))
            .copied()
    }

    /// 合并药罐元数据：仅正值覆盖已有值
    pub fn merge_tank(&mut self, os_code: &str, flow_rate: Option<f64>, tank_capacity: Option<f64>) {
        let entry = self.tanks.entry(os_code.trim().to_string()).or_default();
        if let Some(flow) = flow_rate.filter(|v| v.is_finite() && *v > 0.0) {
            entry.flow_rate = flow;
        }
        if let Some(capacity) = tank_capacity.filter(|v| v.is_finite() && *v > 0.0) {
            entry.tank_capacity = capacity;
        }
    }

    pub fn tank_metadata(&self, os_code: &str) -> Option<TankMetadata> {
        self.tanks.get(os_code.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn os_count(&self) -> usize {
        self.tanks.len()
    }
}

// ==========================================
// TripStatusReconciler - 对账引擎
// ==========================================
pub struct TripStatusReconciler {
    // 无状态引擎
}

impl TripStatusReconciler {
    pub fn new() -> Self {
        Self {}
    }

    /// 构建状态索引
    ///
    /// 无 O.S. 编码的行忽略；同一 (osCode, 序号) 以最后一行为准
    #[instrument(skip(self, records), fields(rows = records.len()))]
    pub fn build_status_index(&self, records: &[SecondaryRecord]) -> StatusIndex {
        let mut index = StatusIndex::new();

        for record in records {
            let os_code = record.os_code.trim();
            if os_code.is_empty() {
                continue;
            }

            index.merge_tank(os_code, record.flow_rate, record.tank_capacity);

            for (ordinal, cell) in &record.trip_cells {
                index.insert(os_code, *ordinal, TripStatus::from_free_text(cell));
            }
        }

        debug!(entries = index.len(), os_count = index.os_count(), "副表状态索引构建完成");
        index
    }

    /// 将索引状态覆盖到车次上
    ///
    /// # 参数
    /// - trips: 某 O.S. 的车次（按生成顺序，序号从 1 开始）
    /// - unmatched: 索引中无对应序号时采用的状态；None 表示保留生成时的状态
    ///
    /// # 返回
    /// 命中索引的车次数
    pub fn apply_status_index(
        &self,
        trips: &mut [Trip],
        os_code: &str,
        index: &StatusIndex,
        unmatched: Option<TripStatus>,
    ) -> usize {
        let mut matched = 0;
        for (position, trip) in trips.iter_mut().enumerate() {
            let ordinal = (position + 1) as u32;
            match index.get(os_code, ordinal) {
                Some(status) => {
                    trip.status = status;
                    matched += 1;
                }
                None => {
                    if let Some(default_status) = unmatched {
                        trip.status = default_status;
                    }
                }
            }
        }
        matched
    }

    /// 人工切换送达状态（纯函数）
    pub fn toggle_status(&self, trip: &Trip) -> Trip {
        let mut toggled = trip.clone();
        toggled.toggle_status();
        toggled
    }
}

impl Default for TripStatusReconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Shift;
    use crate::engine::partitioner::VolumePartitioner;
    use chrono::NaiveDate;

    fn record(os: &str, cells: &[(u32, &str)]) -> SecondaryRecord {
        SecondaryRecord {
            os_code: os.to_string(),
            flow_rate: None,
            tank_capacity: None,
            trip_cells: cells.iter().map(|(o, v)| (*o, v.to_string())).collect(),
        }
    }

    fn generated_trips(total: f64, capacity: f64) -> Vec<Trip> {
        VolumePartitioner::new()
            .partition(
                total,
                capacity,
                NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                Shift::TurnoA,
            )
            .unwrap()
    }

    #[test]
    fn test_build_index_maps_free_text() {
        let reconciler = TripStatusReconciler::new();
        let index = reconciler.build_status_index(&[record(
            "308710",
            &[(1, "Entregue"), (2, "pendente"), (3, "-"), (4, "??")],
        )]);
        assert_eq!(index.get("308710", 1), Some(TripStatus::Delivered));
        assert_eq!(index.get("308710", 2), Some(TripStatus::Available));
        assert_eq!(index.get("308710", 3), Some(TripStatus::Unknown));
        assert_eq!(index.get("308710", 4), Some(TripStatus::Unknown));
        assert_eq!(index.get("308710", 5), None);
    }

    #[test]
    fn test_last_row_wins() {
        let reconciler = TripStatusReconciler::new();
        let index = reconciler.build_status_index(&[
            record("500", &[(1, "DISPONIVEL")]),
            record("500", &[(1, "OK")]),
        ]);
        assert_eq!(index.get("500", 1), Some(TripStatus::Delivered));
    }

    #[test]
    fn test_tank_metadata_keeps_positive_values() {
        let reconciler = TripStatusReconciler::new();
        let mut first = record("700", &[]);
        first.flow_rate = Some(100.0);
        first.tank_capacity = Some(8000.0);
        let mut second = record("700", &[]);
        second.flow_rate = Some(0.0);
        second.tank_capacity = Some(10000.0);

        let index = reconciler.build_status_index(&[first, second]);
        let tank = index.tank_metadata("700").unwrap();
        assert_eq!(tank.flow_rate, 100.0);
        assert_eq!(tank.tank_capacity, 10000.0);
    }

    #[test]
    fn test_unmatched_ordinal_takes_import_default() {
        let reconciler = TripStatusReconciler::new();
        let index = reconciler.build_status_index(&[record("308710", &[(1, "ENTREGUE")])]);
        let mut trips = generated_trips(12000.0, 5000.0);

        let matched =
            reconciler.apply_status_index(&mut trips, "308710", &index, Some(TripStatus::Unknown));

        assert_eq!(matched, 1);
        assert_eq!(trips[0].status, TripStatus::Delivered);
        assert!(trips[0].is_delivered());
        assert_eq!(trips[1].status, TripStatus::Unknown);
        assert!(!trips[1].is_delivered());
        assert_eq!(trips[2].status, TripStatus::Unknown);
    }

    #[test]
    fn test_unmatched_ordinal_keeps_generated_status() {
        let reconciler = TripStatusReconciler::new();
        let index = StatusIndex::new();
        let mut trips = generated_trips(6000.0, 5000.0);
        reconciler.apply_status_index(&mut trips, "308710", &index, None);
        assert!(trips.iter().all(|t| t.status == TripStatus::Available));
    }

    #[test]
    fn test_toggle_status_round_trip() {
        let reconciler = TripStatusReconciler::new();
        let trip = generated_trips(1000.0, 5000.0).remove(0);

        let delivered = reconciler.toggle_status(&trip);
        assert_eq!(delivered.status, TripStatus::Delivered);
        assert!(delivered.is_delivered());

        let back = reconciler.toggle_status(&delivered);
        assert_eq!(back, trip);
    }
}
