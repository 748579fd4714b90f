// ==========================================
// SMART CALDA - 作业导入 Trait
// ==========================================
// 职责: 定义导入接口（不包含实现）
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::file_parser::Workbook;
use crate::importer::operation_importer_impl::{DriverImportSummary, ImportSummary};
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// OperationImporter Trait
// ==========================================
// 用途: 作业表导入主接口
// 实现者: OperationImporterImpl
#[async_trait]
pub trait OperationImporter: Send + Sync {
    /// 从本地文件导入作业表
    ///
    /// # 参数
    /// - file_path: .xlsx / .xls / .ods / .csv
    ///
    /// # 导入流程
    /// 1. 文件读取与解析
    /// 2. 副表列映射 + 状态索引
    /// 3. 主表逐行提取（主数据首见去重）
    /// 4. 每个 O.S. 至多生成一次车次并对账
    /// 5. 每个集合一次 upsert 落库
    async fn import_from_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<ImportSummary>;

    /// 从已解析的工作簿导入（远程下载后走此入口）
    async fn import_workbook(&self, workbook: &Workbook) -> ImportResult<ImportSummary>;

    /// 导入司机表（"Motoristas" / "Drivers"），表不存在时返回 None
    async fn import_drivers(&self, workbook: &Workbook) -> ImportResult<Option<DriverImportSummary>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: ExcelParser, CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件为工作簿（所有工作表，A1 对齐）
    fn parse_workbook(&self, file_path: &Path) -> ImportResult<Workbook>;
}
