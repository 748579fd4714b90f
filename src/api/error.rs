// ==========================================
// SMART CALDA - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户可读的错误消息
// 说明: 校验类错误由调用方就地提示；导入/网络错误只上报一次，不重试
// ==========================================

use crate::engine::partitioner::PartitionError;
use crate::i18n::{t, t_with_args};
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 校验错误（就地提示）
    // ==========================================
    #[error("Entrada inválida para geração de cargas: {0}")]
    InvalidPartitionInput(String),

    #[error("Campo obrigatório ausente: {field}")]
    MissingRequiredField { field: String },

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    // ==========================================
    // 交互式处理（切换编辑 / 二次确认）
    // ==========================================
    #[error("{entity} já cadastrado: {name} (id={existing_id})")]
    DuplicateNameConflict {
        entity: String,
        name: String,
        existing_id: String,
    },

    #[error("O.S. {os_code} já possui {existing_trips} cargas; confirme para substituir")]
    ConfirmationRequired { os_code: String, existing_trips: usize },

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("Falha na importação: {0}")]
    ImportParseFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("Registro não encontrado: {0}")]
    NotFound(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(String),

    #[error("Erro de configuração: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 本地化提示（当前 locale）
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InvalidPartitionInput(reason) => {
                t_with_args("error.invalid_partition_input", &[("reason", reason.as_str())])
            }
            ApiError::MissingRequiredField { field } => {
                t_with_args("error.missing_required_field", &[("field", field.as_str())])
            }
            ApiError::InvalidInput(reason) => t_with_args("error.invalid_input", &[("reason", reason.as_str())]),
            ApiError::DuplicateNameConflict {
                entity,
                name,
                existing_id,
            } => t_with_args(
                "error.duplicate_name",
                &[("entity", entity.as_str()), ("name", name.as_str()), ("id", existing_id.as_str())],
            ),
            ApiError::ConfirmationRequired {
                os_code,
                existing_trips,
            } => t_with_args(
                "error.confirmation_required",
                &[("os", os_code.as_str()), ("count", existing_trips.to_string().as_str())],
            ),
            ApiError::ImportParseFailure(reason) => {
                t_with_args("error.import_failed", &[("reason", reason.as_str())])
            }
            ApiError::NotFound(what) => t_with_args("error.not_found", &[("what", what.as_str())]),
            ApiError::DatabaseError(_) | ApiError::ConfigError(_) | ApiError::Other(_) => {
                t("error.internal")
            }
        }
    }
}

// ==========================================
// 从下层错误转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})", entity, id))
            }
            RepositoryError::InvalidSnapshot(msg) => ApiError::InvalidInput(msg),
            RepositoryError::SerializationError { entity, message } => {
                ApiError::InvalidInput(format!("{}: {}", entity, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<PartitionError> for ApiError {
    fn from(err: PartitionError) -> Self {
        match err {
            PartitionError::InvalidPartitionInput { reason, .. } => {
                ApiError::InvalidPartitionInput(reason)
            }
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ImportParseFailure(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "Motorista".to_string(),
            id: "d1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(ref s) if s.contains("d1")));
    }

    #[test]
    fn test_import_errors_collapse_to_parse_failure() {
        let err: ApiError = ImportError::SheetNotFound("Planilha1".to_string()).into();
        assert!(matches!(err, ApiError::ImportParseFailure(ref s) if s.contains("Planilha1")));
    }

    #[test]
    fn test_partition_error_keeps_reason() {
        let err: ApiError = PartitionError::InvalidPartitionInput {
            total: 0.0,
            capacity: 5000.0,
            reason: "volume total deve ser maior que zero".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::InvalidPartitionInput(ref s) if s.contains("zero")));
    }
}
