// ==========================================
// SMART CALDA - 核心库
// ==========================================
// 系统定位: 药液（calda）调配与运输看板
// 技术栈: Rust + SQLite
// 范围: O.S. 导入、车次拆分与对账、分类与指标、日报
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "pt-BR");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OperationStatus, OsCategory, Shift, TripStatus};

// 领域实体
pub use domain::{Driver, Location, Resource, Section, ServiceOrderLine, Supervisor, Trip, Truck};

// 引擎
pub use engine::{
    ClassificationEngine, DailyReportEngine, MetricsAggregator, OperationAggregator,
    TripStatusReconciler, VolumePartitioner,
};

// API
pub use api::{ApiError, DashboardApi, ImportApi, MasterDataApi, OperationApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "SMART CALDA";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "SMART CALDA");
    }
}
