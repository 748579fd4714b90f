// ==========================================
// SMART CALDA - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 所有仓储与配置共用同一个 SQLite 连接
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{DashboardApi, ImportApi, MasterDataApi, OperationApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::repositories::EntityRepositories;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "SMART_CALDA_DB_PATH";

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理
    pub config: Arc<ConfigManager>,

    /// 作业 / 车次 API
    pub operation_api: Arc<OperationApi>,

    /// 主数据 API
    pub master_data_api: Arc<MasterDataApi>,

    /// 驾驶舱 API
    pub dashboard_api: Arc<DashboardApi>,

    /// 导入 / 备份 API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 返回
    /// - Err(String): 数据库无法打开或建表失败
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("Não foi possível abrir o banco de dados: {}", e))?;
        init_schema(&conn).map_err(|e| format!("Falha ao criar o esquema: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("Falha ao iniciar a configuração: {}", e))?,
        );
        let repos = EntityRepositories::sqlite(conn);

        Ok(Self {
            db_path,
            operation_api: Arc::new(OperationApi::new(repos.clone())),
            master_data_api: Arc::new(MasterDataApi::new(repos.clone())),
            dashboard_api: Arc::new(DashboardApi::new(repos.clone(), config.clone())),
            import_api: Arc::new(ImportApi::new(repos, config.clone())),
            config,
        })
    }
}

/// 默认数据库路径
///
/// 优先级：环境变量 SMART_CALDA_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./smart_calda.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("smart-calda");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("smart_calda.db");
        }
    }

    path.to_string_lossy().to_string()
}
