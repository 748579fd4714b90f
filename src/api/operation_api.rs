// ==========================================
// SMART CALDA - 作业 API
// ==========================================
// 职责: 作业行保存、药液总量计算、车次生成与人工维护
// 红线: 已有车次时重新生成必须先确认；车次变更落库后才返回
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::operation::{ServiceOrderLine, Trip};
use crate::domain::types::Shift;
use crate::engine::partitioner::{round_decimals, VolumePartitioner};
use crate::engine::reconciler::TripStatusReconciler;
use crate::repository::repositories::EntityRepositories;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// 车次生成请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripGenerationRequest {
    pub operation_id: String,
    /// 药液总量 (L)
    pub total_volume: f64,
    /// 车辆罐容 (L)
    pub tank_capacity: f64,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_shift: Option<Shift>,
    /// 已有车次时需显式确认覆盖
    #[serde(default)]
    pub confirmed: bool,
}

// ==========================================
// OperationApi - 作业 API
// ==========================================
pub struct OperationApi {
    repos: EntityRepositories,
    partitioner: VolumePartitioner,
    reconciler: TripStatusReconciler,
}

impl OperationApi {
    pub fn new(repos: EntityRepositories) -> Self {
        Self {
            repos,
            partitioner: VolumePartitioner::new(),
            reconciler: TripStatusReconciler::new(),
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn list_operations(&self) -> ApiResult<Vec<ServiceOrderLine>> {
        Ok(self.repos.operations.list()?)
    }

    pub fn get_operation(&self, operation_id: &str) -> ApiResult<ServiceOrderLine> {
        Ok(self.repos.operations.require(operation_id)?)
    }

    // ==========================================
    // 计算接口
    // ==========================================

    /// 药罐总量 = 面积 × 药液流量（2 位小数）
    pub fn compute_application_total(area: f64, flow_rate: f64) -> f64 {
        round_decimals(area * flow_rate, 2)
    }

    /// 产品总量 = 面积 × 剂量（4 位小数）
    pub fn compute_product_total(area: f64, dose: f64) -> f64 {
        round_decimals(area * dose, 4)
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 保存作业行（新建或编辑）
    ///
    /// # 规则
    /// - O.S. 编码、作业编号必填
    /// - 编辑时保留 id 与 createdAt
    /// - 新建时 id = "{osCode}-{resourceId 或随机串}"
    #[instrument(skip(self, draft), fields(os_code = %draft.os_code))]
    pub fn save_operation(&self, mut draft: ServiceOrderLine) -> ApiResult<ServiceOrderLine> {
        draft.os_code = draft.os_code.trim().to_string();
        draft.operation_number = draft.operation_number.trim().to_string();

        if draft.os_code.is_empty() {
            return Err(ApiError::MissingRequiredField {
                field: "osCode".to_string(),
            });
        }
        if draft.operation_number.is_empty() {
            return Err(ApiError::MissingRequiredField {
                field: "operationNumber".to_string(),
            });
        }

        let existing = if draft.id.trim().is_empty() {
            None
        } else {
            self.repos.operations.get(&draft.id)?
        };

        match existing {
            Some(previous) => {
                draft.created_at = previous.created_at;
                debug!(id = %draft.id, "编辑作业行");
            }
            None => {
                if draft.id.trim().is_empty() {
                    let suffix = if draft.resource_id.trim().is_empty() {
                        short_random_id()
                    } else {
                        draft.resource_id.trim().to_string()
                    };
                    draft.id = format!("{}-{}", draft.os_code, suffix);
                }
                draft.created_at = chrono::Utc::now();
                info!(id = %draft.id, "新建作业行");
            }
        }

        self.repos.operations.put(&draft)?;
        Ok(draft)
    }

    /// 生成车次（覆盖原有车次需确认）
    ///
    /// # 错误
    /// - InvalidPartitionInput: 总量或罐容非法
    /// - MissingRequiredField: 交付日期或班次缺失
    /// - ConfirmationRequired: 已有车次且未确认
    #[instrument(skip(self), fields(trips))]
    pub fn generate_trips(&self, request: &TripGenerationRequest) -> ApiResult<ServiceOrderLine> {
        // 先校验输入，避免未确认提示掩盖输入错误
        self.partitioner
            .plan_loads(request.total_volume, request.tank_capacity)?;
        let delivery_date = request.delivery_date.ok_or_else(|| ApiError::MissingRequiredField {
            field: "deliveryDate".to_string(),
        })?;
        let delivery_shift = request.delivery_shift.ok_or_else(|| ApiError::MissingRequiredField {
            field: "deliveryShift".to_string(),
        })?;

        let mut line = self.repos.operations.require(&request.operation_id)?;

        // 车次属于整个 O.S.：同组其他行已有车次也需确认
        let siblings: Vec<ServiceOrderLine> = self
            .repos
            .operations
            .list()?
            .into_iter()
            .filter(|other| other.id != line.id && other.group_key() == line.group_key())
            .collect();
        let existing_trips =
            line.volumes.len() + siblings.iter().map(|other| other.volumes.len()).sum::<usize>();
        if existing_trips > 0 && !request.confirmed {
            return Err(ApiError::ConfirmationRequired {
                os_code: line.os_code.clone(),
                existing_trips,
            });
        }

        let trips = self.partitioner.partition(
            request.total_volume,
            request.tank_capacity,
            delivery_date,
            delivery_shift,
        )?;
        tracing::Span::current().record("trips", trips.len());

        line.application_total_volume = Some(request.total_volume);
        line.truck_capacity = Some(request.tank_capacity);
        line.volumes = trips;

        let mut changed: Vec<ServiceOrderLine> = siblings
            .into_iter()
            .filter(|other| !other.volumes.is_empty())
            .map(|mut other| {
                other.volumes.clear();
                other
            })
            .collect();
        if !changed.is_empty() {
            debug!(cleared = changed.len(), "清除同组旧车次");
        }
        changed.push(line.clone());
        self.repos.operations.upsert_batch(changed)?;

        info!(operation_id = %line.id, trips = line.volumes.len(), "车次已生成");
        Ok(line)
    }

    /// 切换车次送达状态（ENTREGUE ↔ DISPONIVEL）
    pub fn toggle_trip_status(&self, operation_id: &str, trip_id: &str) -> ApiResult<Trip> {
        self.update_trip(operation_id, trip_id, |reconciler, trip| {
            *trip = reconciler.toggle_status(trip);
        })
    }

    /// 修改车次交付日期
    pub fn update_trip_date(
        &self,
        operation_id: &str,
        trip_id: &str,
        delivery_date: NaiveDate,
    ) -> ApiResult<Trip> {
        self.update_trip(operation_id, trip_id, |_, trip| {
            trip.delivery_date = Some(delivery_date);
        })
    }

    /// 删除单个车次
    pub fn remove_trip(&self, operation_id: &str, trip_id: &str) -> ApiResult<ServiceOrderLine> {
        let mut line = self.repos.operations.require(operation_id)?;
        let before = line.volumes.len();
        line.volumes.retain(|t| t.id != trip_id);
        if line.volumes.len() == before {
            return Err(trip_not_found(operation_id, trip_id));
        }

        self.repos.operations.put(&line)?;
        Ok(line)
    }

    fn update_trip<F>(&self, operation_id: &str, trip_id: &str, mutate: F) -> ApiResult<Trip>
    where
        F: FnOnce(&TripStatusReconciler, &mut Trip),
    {
        let mut line = self.repos.operations.require(operation_id)?;
        let trip = line
            .trip_mut(trip_id)
            .ok_or_else(|| trip_not_found(operation_id, trip_id))?;
        mutate(&self.reconciler, trip);
        let updated = trip.clone();

        self.repos.operations.put(&line)?;
        Ok(updated)
    }
}

fn trip_not_found(operation_id: &str, trip_id: &str) -> ApiError {
    ApiError::NotFound(format!("carga {} da operação {}", trip_id, operation_id))
}

fn short_random_id() -> String {
    Uuid::new_v4().simple().to_string()[..9].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TripStatus;

    fn api_with_line() -> OperationApi {
        let api = OperationApi::new(EntityRepositories::in_memory());
        let mut draft = ServiceOrderLine::new("", "308710");
        draft.operation_number = "10".to_string();
        draft.resource_id = "R1".to_string();
        api.save_operation(draft).unwrap();
        api
    }

    fn request(total: f64, capacity: f64, confirmed: bool) -> TripGenerationRequest {
        TripGenerationRequest {
            operation_id: "308710-R1".to_string(),
            total_volume: total,
            tank_capacity: capacity,
            delivery_date: NaiveDate::from_ymd_opt(2024, 6, 3),
            delivery_shift: Some(Shift::TurnoB),
            confirmed,
        }
    }

    #[test]
    fn test_save_requires_os_and_operation_number() {
        let api = OperationApi::new(EntityRepositories::in_memory());
        let draft = ServiceOrderLine::new("", " ");
        assert!(matches!(
            api.save_operation(draft),
            Err(ApiError::MissingRequiredField { ref field }) if field == "osCode"
        ));

        let draft = ServiceOrderLine::new("", "308710");
        assert!(matches!(
            api.save_operation(draft),
            Err(ApiError::MissingRequiredField { ref field }) if field == "operationNumber"
        ));
    }

    #[test]
    fn test_edit_keeps_created_at() {
        let api = api_with_line();
        let saved = api.get_operation("308710-R1").unwrap();

        let mut edited = saved.clone();
        edited.operation_description = "Herbicida".to_string();
        edited.created_at = chrono::Utc::now() + chrono::Duration::days(1);
        let result = api.save_operation(edited).unwrap();

        assert_eq!(result.created_at, saved.created_at);
        assert_eq!(api.list_operations().unwrap().len(), 1);
    }

    #[test]
    fn test_generate_requires_confirmation_to_replace() {
        let api = api_with_line();
        let line = api.generate_trips(&request(12000.0, 5000.0, false)).unwrap();
        let liters: Vec<f64> = line.volumes.iter().map(|t| t.liters).collect();
        assert_eq!(liters, vec![5000.0, 5000.0, 2000.0]);
        assert!(line.volumes.iter().all(|t| t.status == TripStatus::Available));

        let err = api.generate_trips(&request(8000.0, 5000.0, false)).unwrap_err();
        assert!(matches!(err, ApiError::ConfirmationRequired { existing_trips: 3, .. }));
        assert_eq!(api.get_operation("308710-R1").unwrap().volumes.len(), 3);

        let line = api.generate_trips(&request(8000.0, 5000.0, true)).unwrap();
        assert_eq!(line.volumes.len(), 2);
    }

    #[test]
    fn test_trips_are_owned_by_the_whole_os() {
        let api = api_with_line();
        let mut sibling = ServiceOrderLine::new("", "308710");
        sibling.operation_number = "10".to_string();
        sibling.resource_id = "R2".to_string();
        api.save_operation(sibling).unwrap();

        api.generate_trips(&request(10000.0, 5000.0, false)).unwrap();

        let mut on_sibling = request(3000.0, 5000.0, false);
        on_sibling.operation_id = "308710-R2".to_string();
        let err = api.generate_trips(&on_sibling).unwrap_err();
        assert!(matches!(err, ApiError::ConfirmationRequired { existing_trips: 2, .. }));

        on_sibling.confirmed = true;
        api.generate_trips(&on_sibling).unwrap();

        let trips: Vec<usize> = api
            .list_operations()
            .unwrap()
            .iter()
            .map(|op| op.volumes.len())
            .collect();
        assert_eq!(trips, vec![0, 1]);
    }

    #[test]
    fn test_generate_validates_inputs() {
        let api = api_with_line();
        assert!(matches!(
            api.generate_trips(&request(0.0, 5000.0, false)),
            Err(ApiError::InvalidPartitionInput(_))
        ));

        let mut missing_date = request(1000.0, 500.0, false);
        missing_date.delivery_date = None;
        assert!(matches!(
            api.generate_trips(&missing_date),
            Err(ApiError::MissingRequiredField { ref field }) if field == "deliveryDate"
        ));
    }

    #[test]
    fn test_trip_mutations_are_persisted() {
        let api = api_with_line();
        let line = api.generate_trips(&request(1000.0, 500.0, false)).unwrap();
        let trip_id = line.volumes[0].id.clone();

        let toggled = api.toggle_trip_status("308710-R1", &trip_id).unwrap();
        assert!(toggled.is_delivered());
        let stored = api.get_operation("308710-R1").unwrap();
        assert_eq!(stored.volumes[0].status, TripStatus::Delivered);

        let new_date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        api.update_trip_date("308710-R1", &trip_id, new_date).unwrap();
        assert_eq!(
            api.get_operation("308710-R1").unwrap().volumes[0].delivery_date,
            Some(new_date)
        );

        let line = api.remove_trip("308710-R1", &trip_id).unwrap();
        assert_eq!(line.volumes.len(), 1);
        assert!(matches!(
            api.remove_trip("308710-R1", &trip_id),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_compute_totals() {
        assert_eq!(OperationApi::compute_application_total(12.345, 100.0), 1234.5);
        assert_eq!(OperationApi::compute_product_total(12.5, 0.33333), 4.1666);
    }
}
