// ==========================================
// SMART CALDA - 作业与运输实体
// ==========================================
// 职责: ServiceOrderLine（O.S. 产品行）与 Trip（单车运输）
// 红线: Trip.is_delivered 由状态派生，任何修改入口不得单独改写
// ==========================================

use crate::domain::types::{OperationStatus, Shift, TripStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Trip - 单车运输
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TripRecord", into = "TripRecord")]
pub struct Trip {
    pub id: String,
    /// 装载量（升，保留一位小数）
    pub liters: f64,
    pub timestamp: DateTime<Utc>,
    pub status: TripStatus,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_shift: Option<Shift>,
}

impl Trip {
    pub fn is_delivered(&self) -> bool {
        self.status.is_delivered()
    }

    /// 人工切换送达状态，返回新状态
    pub fn toggle_status(&mut self) -> TripStatus {
        self.status = self.status.toggled();
        self.status
    }
}

/// Trip 的持久化形态
///
/// 兼容历史数据：
/// - isDelivered=true 一律视为 ENTREGUE
/// - 标签为 ENTREGUE 但 isDelivered=false 视为 DISPONIVEL（历史切换只改了布尔值）
/// - 无标签且未送达 → SEM INFO.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripRecord {
    id: String,
    #[serde(default)]
    liters: f64,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    is_delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delivery_shift: Option<String>,
}

impl From<TripRecord> for Trip {
    fn from(record: TripRecord) -> Self {
        let labelled = record
            .status_label
            .as_deref()
            .map(TripStatus::from_free_text)
            .unwrap_or(TripStatus::Unknown);
        let status = match (record.is_delivered, labelled) {
            (true, _) => TripStatus::Delivered,
            (false, TripStatus::Delivered) => TripStatus::Available,
            (false, other) => other,
        };

        Trip {
            id: record.id,
            liters: record.liters,
            timestamp: record.timestamp,
            status,
            delivery_date: record.delivery_date.as_deref().and_then(parse_iso_date),
            delivery_shift: record.delivery_shift.as_deref().and_then(Shift::parse),
        }
    }
}

impl From<Trip> for TripRecord {
    fn from(trip: Trip) -> Self {
        TripRecord {
            id: trip.id,
            liters: trip.liters,
            timestamp: trip.timestamp,
            is_delivered: trip.status.is_delivered(),
            status_label: Some(trip.status.label().to_string()),
            delivery_date: trip.delivery_date.map(|d| d.format("%Y-%m-%d").to_string()),
            delivery_shift: trip.delivery_shift.map(|s| s.label().to_string()),
        }
    }
}

/// 解析 ISO 日期（接受 "YYYY-MM-DD" 或完整时间戳前缀）
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

// ==========================================
// ServiceOrderLine - O.S. 产品行
// ==========================================
// 同一 osCode 下每个产品一行；罐级字段（application_* / truck_capacity）在 O.S. 内共享
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrderLine {
    pub id: String,
    #[serde(default)]
    pub os_code: String,
    #[serde(default)]
    pub operation_number: String,
    #[serde(default)]
    pub operation_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub issue_date: String,
    #[serde(default)]
    pub os_age: String,
    #[serde(default)]
    pub os_situation: String,

    // ===== 关联 (按 id 引用) =====
    #[serde(default)]
    pub supervisor_id: String,
    #[serde(default)]
    pub section_id: String,
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub truck_id: String,
    #[serde(default)]
    pub driver_id: String,

    // ===== 产品剂量字段 =====
    #[serde(default)]
    pub production_area: f64,
    #[serde(default)]
    pub flow_rate: f64,
    #[serde(default)]
    pub target_volume: f64,

    // ===== 药罐字段 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_flow_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_total_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truck_capacity: Option<f64>,

    #[serde(default)]
    pub volumes: Vec<Trip>,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ServiceOrderLine {
    /// 创建空白行（其余字段取默认值）
    pub fn new(id: impl Into<String>, os_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            os_code: os_code.into(),
            operation_number: String::new(),
            operation_description: String::new(),
            date: None,
            issue_date: String::new(),
            os_age: String::new(),
            os_situation: String::new(),
            supervisor_id: String::new(),
            section_id: String::new(),
            location_id: String::new(),
            resource_id: String::new(),
            resource_name: None,
            truck_id: String::new(),
            driver_id: String::new(),
            production_area: 0.0,
            flow_rate: 0.0,
            target_volume: 0.0,
            application_area: None,
            application_flow_rate: None,
            application_total_volume: None,
            truck_capacity: None,
            volumes: Vec::new(),
            status: OperationStatus::Mixing,
            created_at: Utc::now(),
        }
    }

    /// 分组键：osCode（去首尾空白）非空取 osCode，否则取 id
    pub fn group_key(&self) -> &str {
        let os_code = self.os_code.trim();
        if os_code.is_empty() {
            &self.id
        } else {
            os_code
        }
    }

    pub fn trip_mut(&mut self, trip_id: &str) -> Option<&mut Trip> {
        self.volumes.iter_mut().find(|t| t.id == trip_id)
    }
}
