// ==========================================
// SMART CALDA - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、集合约定
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod entity;
pub mod master_data;
pub mod operation;
pub mod types;

// 重导出核心类型
pub use entity::{collection_keys, StoredEntity};
pub use master_data::{Driver, Location, Resource, Section, Supervisor, Truck};
pub use operation::{ServiceOrderLine, Trip};
pub use types::{OperationStatus, OsCategory, Shift, TripStatus};
