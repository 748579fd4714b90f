// ==========================================
// SMART CALDA - 导入层
// ==========================================
// 职责: 工作簿（本地文件 / 远程下载）→ 实体集合
// 支持: Excel (.xlsx/.xls/.ods), CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod operation_importer_impl;
pub mod operation_importer_trait;
pub mod remote_fetch;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::{FieldMapper, PrimaryRow, SecondaryColumns, SecondarySheetMapping};
pub use file_parser::{CellValue, CsvParser, ExcelParser, SheetGrid, UniversalFileParser, Workbook};
pub use operation_importer_impl::{DriverImportSummary, ImportSummary, OperationImporterImpl};
pub use remote_fetch::RemoteWorkbookFetcher;

// 重导出 Trait 接口
pub use operation_importer_trait::{FileParser, OperationImporter};
