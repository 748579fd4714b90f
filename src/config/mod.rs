// ==========================================
// SMART CALDA - 配置层
// ==========================================
// 职责: 系统配置管理（阈值、表格地址、列映射）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, DashboardSettings};
pub use import_config_trait::ImportConfigReader;

/// 配置层 Result（错误需可跨 await 传递）
pub type ConfigResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
