// ==========================================
// SMART CALDA - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 对外统一折叠为 ApiError::ImportParseFailure
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("Arquivo não encontrado: {0}")]
    FileNotFound(String),

    #[error("Formato não suportado: {0} (use .xlsx/.xls/.ods/.csv)")]
    UnsupportedFormat(String),

    #[error("Falha na leitura do arquivo: {0}")]
    FileReadError(String),

    #[error("Falha ao interpretar planilha Excel: {0}")]
    ExcelParseError(String),

    #[error("Falha ao interpretar CSV: {0}")]
    CsvParseError(String),

    // ===== 结构错误 =====
    #[error("Planilha não encontrada: {0}")]
    SheetNotFound(String),

    #[error("Coluna obrigatória ausente na planilha '{sheet}': {role} (cabeçalhos: {headers:?})")]
    MissingColumn {
        sheet: String,
        role: String,
        headers: Vec<String>,
    },

    // ===== 远程获取 =====
    #[error("Falha ao baixar planilha remota: {0}")]
    RemoteFetchError(String),

    // ===== 配置 / 存储 =====
    #[error("Falha ao ler configuração (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("Falha ao gravar dados importados: {0}")]
    DatabaseError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::DatabaseError(err.to_string())
    }
}

impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        ImportError::DatabaseError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::RemoteFetchError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
