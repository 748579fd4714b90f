// ==========================================
// SMART CALDA - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::ConfigResult;
use crate::domain::types::{Shift, TripStatus};
use crate::importer::field_mapper::SecondarySheetMapping;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 主表数据起始行（0 起始）
    ///
    /// # 默认值
    /// - 2（前两行为标题）
    async fn get_primary_data_start_row(&self) -> ConfigResult<usize>;

    /// 副表中无对应序号的车次状态
    ///
    /// # 默认值
    /// - SEM INFO.
    async fn get_unmatched_trip_status(&self) -> ConfigResult<TripStatus>;

    /// 导入生成车次的交付班次
    ///
    /// # 默认值
    /// - Turno A
    async fn get_default_delivery_shift(&self) -> ConfigResult<Shift>;

    /// 副表列映射
    ///
    /// # 默认值
    /// - SecondarySheetMapping::default()
    async fn get_secondary_sheet_mapping(&self) -> ConfigResult<SecondarySheetMapping>;

    /// 远程表格地址
    async fn get_spreadsheet_url(&self) -> ConfigResult<String>;
}
