// ==========================================
// SMART CALDA - 主数据实体
// ==========================================
// 职责: 司机 / 负责人 / 车辆 / 分区 / 产品 / 地块
// 说明: 纯键值主记录，无生命周期状态
// ==========================================

use crate::domain::types::Shift;
use serde::{Deserialize, Serialize};

/// 司机
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub shift: Shift,
}

/// 负责人（Encarregado），id 来自主表 J 列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supervisor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub work_front: String,
}

/// 运输车辆，id 为车牌
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truck {
    pub id: String,
    #[serde(default)]
    pub max_capacity: f64,
    #[serde(default)]
    pub company: String,
}

/// 分区（Seção），主表 F/G 列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
}

/// 产品（Recurso / 药剂），主表 D/E 列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub name: String,
}

/// 地块（Setor），主表 H/I 列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub sector_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_description: Option<String>,
}
