// ==========================================
// SMART CALDA - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("Registro não encontrado: {entity} com id={id}")]
    NotFound { entity: String, id: String },

    #[error("Falha ao abrir o banco de dados: {0}")]
    DatabaseConnectionError(String),

    #[error("Falha ao obter o bloqueio do banco de dados: {0}")]
    LockError(String),

    #[error("Falha na transação: {0}")]
    DatabaseTransactionError(String),

    #[error("Falha na consulta: {0}")]
    DatabaseQueryError(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    // ===== 数据格式错误 =====
    #[error("Falha de serialização ({entity}): {message}")]
    SerializationError { entity: String, message: String },

    #[error("Snapshot inválido: {0}")]
    InvalidSnapshot(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError {
            entity: "Unknown".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
