// ==========================================
// SMART CALDA - API 层
// ==========================================
// 职责: 提供业务 API 接口，供界面 / 命令行调用
// ==========================================

pub mod dashboard_api;
pub mod error;
pub mod import_api;
pub mod master_data_api;
pub mod operation_api;

// 重导出核心类型
pub use dashboard_api::{
    CategoryCounts, CategoryKeys, DashboardApi, DashboardOverview, GroupFilter, GroupSummary,
};
pub use error::{ApiError, ApiResult};
pub use import_api::{BackupSnapshot, ImportApi, RestoreSummary};
pub use master_data_api::MasterDataApi;
pub use operation_api::{OperationApi, TripGenerationRequest};
