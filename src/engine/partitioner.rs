// ==========================================
// SMART CALDA - 药液分车引擎
// ==========================================
// 职责: 将 O.S. 药罐总量按车辆罐容拆分为若干车次
// 输入: 总量(L) + 罐容(L) + 基准日期 + 班次
// 输出: Vec<Trip>，初始状态 DISPONIVEL
// 红线: 输入非法必须报错，不允许静默返回空序列
// ==========================================

use crate::domain::operation::Trip;
use crate::domain::types::{Shift, TripStatus};
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

/// 残量阈值（升）：剩余量低于该值时停止分车，残量直接舍弃
pub const RESIDUE_EPSILON_L: f64 = 0.1;

/// 单次分车允许的最大车次数
pub const MAX_TRIPS_PER_PARTITION: usize = 10_000;

const FLOAT_TOLERANCE: f64 = 1e-9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    #[error("Dados inválidos para gerar cargas (total={total}, capacidade={capacity}): {reason}")]
    InvalidPartitionInput {
        total: f64,
        capacity: f64,
        reason: String,
    },
}

pub type PartitionResult<T> = Result<T, PartitionError>;

/// 保留一位小数（四舍五入）
pub fn round_one_decimal(value: f64) -> f64 {
    round_decimals(value, 1)
}

/// 保留 n 位小数（四舍五入）
pub fn round_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn floor_one_decimal(value: f64) -> f64 {
    (value * 10.0 + FLOAT_TOLERANCE).floor() / 10.0
}

// ==========================================
// VolumePartitioner - 分车引擎
// ==========================================
pub struct VolumePartitioner {
    // 无状态引擎
}

impl VolumePartitioner {
    pub fn new() -> Self {
        Self {}
    }

    /// 拆分药罐总量
    ///
    /// # 规则
    /// 1) 每车装载 min(剩余量, 罐容)，先保留一位小数再扣减
    /// 2) 舍入结果超过罐容或剩余量时向下取整，保证单车不超罐容、合计不超总量
    /// 3) 剩余量 < 0.1 L 时停止，残量舍弃（最多少计 0.1 L）
    ///
    /// # 错误
    /// - 总量或罐容非有限数 / <= 0
    /// - 罐容 < 0.1 L（无法装出一位小数的有效车次）
    /// - 车次数超过 MAX_TRIPS_PER_PARTITION
    #[instrument(skip(self), fields(trips))]
    pub fn partition(
        &self,
        total_volume: f64,
        tank_capacity: f64,
        base_date: NaiveDate,
        shift: Shift,
    ) -> PartitionResult<Vec<Trip>> {
        let amounts = self.plan_loads(total_volume, tank_capacity)?;
        let now = Utc::now();

        let trips: Vec<Trip> = amounts
            .into_iter()
            .map(|liters| Trip {
                id: Uuid::new_v4().to_string(),
                liters,
                timestamp: now,
                status: TripStatus::Available,
                delivery_date: Some(base_date),
                delivery_shift: Some(shift),
            })
            .collect();

        tracing::Span::current().record("trips", trips.len());
        Ok(trips)
    }

    /// 只计算每车装载量，不生成 Trip
    pub fn plan_loads(&self, total_volume: f64, tank_capacity: f64) -> PartitionResult<Vec<f64>> {
        validate_inputs(total_volume, tank_capacity)?;

        let mut loads = Vec::new();
        let mut remaining = total_volume;

        while remaining >= RESIDUE_EPSILON_L {
            let raw = remaining.min(tank_capacity);
            let mut amount = round_one_decimal(raw);
            if amount > raw + FLOAT_TOLERANCE {
                amount = floor_one_decimal(raw);
            }
            if amount <= 0.0 {
                break;
            }

            loads.push(amount);
            remaining -= amount;

            if loads.len() > MAX_TRIPS_PER_PARTITION {
                return Err(PartitionError::InvalidPartitionInput {
                    total: total_volume,
                    capacity: tank_capacity,
                    reason: format!("mais de {} cargas", MAX_TRIPS_PER_PARTITION),
                });
            }
        }

        if remaining > FLOAT_TOLERANCE {
            debug!(residue_l = remaining, "残量低于阈值，已舍弃");
        }

        Ok(loads)
    }
}

impl Default for VolumePartitioner {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_inputs(total_volume: f64, tank_capacity: f64) -> PartitionResult<()> {
    let reason = if !total_volume.is_finite() || total_volume <= 0.0 {
        Some("volume total deve ser maior que zero")
    } else if !tank_capacity.is_finite() || tank_capacity <= 0.0 {
        Some("capacidade do tanque deve ser maior que zero")
    } else if tank_capacity < RESIDUE_EPSILON_L {
        Some("capacidade do tanque inferior a 0,1 L")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PartitionError::InvalidPartitionInput {
            total: total_volume,
            capacity: tank_capacity,
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
