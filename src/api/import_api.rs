// ==========================================
// SMART CALDA - 导入 API
// ==========================================
// 职责: 本地文件导入、远程表格导入、数据备份与恢复
// 说明: 导入失败只上报一次（ImportParseFailure），不重试；
//       失败前已提交的批次不回滚
// ==========================================

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::importer::{ImportSummary, OperationImporter, OperationImporterImpl, RemoteWorkbookFetcher};
use crate::repository::repositories::EntityRepositories;
use crate::repository::snapshot::SnapshotService;

/// 完整备份：实体集合 + 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    /// { storageKey: [实体...] }
    pub entities: Value,
    /// { key: value }
    #[serde(default)]
    pub config: Value,
}

/// 恢复结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub collections: BTreeMap<String, usize>,
    pub config_keys: usize,
}

// ==========================================
// ImportApi - 导入 API
// ==========================================
pub struct ImportApi {
    importer: OperationImporterImpl<ConfigManager>,
    config: Arc<ConfigManager>,
    snapshots: SnapshotService,
}

impl ImportApi {
    pub fn new(repos: EntityRepositories, config: Arc<ConfigManager>) -> Self {
        Self {
            importer: OperationImporterImpl::new(repos.clone(), config.clone()),
            config,
            snapshots: SnapshotService::new(repos),
        }
    }

    /// 导入本地工作簿（.xlsx / .xls / .ods / .csv）
    pub async fn import_file(&self, file_path: &Path) -> ApiResult<ImportSummary> {
        let summary = self.importer.import_from_file(file_path).await.map_err(|e| {
            error!(file = %file_path.display(), error = %e, "导入失败");
            ApiError::from(e)
        })?;

        info!(message = %summary.message(), "本地导入完成");
        Ok(summary)
    }

    /// 从远程地址导入（url 为空时使用配置 spreadsheet_url）
    pub async fn import_remote(&self, url: Option<&str>) -> ApiResult<ImportSummary> {
        let url = match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(u) => u.to_string(),
            None => self
                .config
                .get_spreadsheet_url()
                .await
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        };

        let fetcher = RemoteWorkbookFetcher::new()?;
        let workbook = fetcher.fetch_workbook(&url).await.map_err(|e| {
            error!(url = %url, error = %e, "远程表格获取失败");
            ApiError::from(e)
        })?;

        let summary = self.importer.import_workbook(&workbook).await?;
        info!(url = %url, message = %summary.message(), "远程导入完成");
        Ok(summary)
    }

    // ==========================================
    // 备份 / 恢复
    // ==========================================

    pub fn export_snapshot(&self) -> ApiResult<BackupSnapshot> {
        let entities = self.snapshots.export()?;
        let config_json = self
            .config
            .get_config_snapshot()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let config = serde_json::from_str(&config_json)
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        Ok(BackupSnapshot { entities, config })
    }

    /// 恢复完整备份（upsert，不删除现有记录）
    pub fn restore_snapshot(&self, backup: &BackupSnapshot) -> ApiResult<RestoreSummary> {
        let collections = self.snapshots.restore(&backup.entities)?;

        let config_keys = match &backup.config {
            Value::Null => 0,
            Value::Object(map) if map.is_empty() => 0,
            config => self
                .config
                .restore_config_from_snapshot(&config.to_string())
                .map_err(|e| ApiError::InvalidInput(e.to_string()))?,
        };

        info!(config_keys, "备份已恢复");
        Ok(RestoreSummary {
            collections,
            config_keys,
        })
    }

    /// 仅恢复实体集合（兼容浏览器版导出的 localStorage 数据）
    pub fn restore_entities(&self, entities: &Value) -> ApiResult<BTreeMap<String, usize>> {
        Ok(self.snapshots.restore(entities)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_keys;
    use crate::db::init_schema;
    use crate::domain::master_data::Driver;
    use crate::domain::types::Shift;
    use rusqlite::Connection;
    use serde_json::json;
    use std::sync::Mutex;

    fn api() -> (ImportApi, EntityRepositories, Arc<ConfigManager>) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let config = Arc::new(ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap());
        let repos = EntityRepositories::in_memory();
        (ImportApi::new(repos.clone(), config.clone()), repos, config)
    }

    #[test]
    fn test_backup_round_trip_carries_config() {
        let (api, repos, config) = api();
        repos
            .drivers
            .put(&Driver {
                id: "d1".to_string(),
                name: "Ana".to_string(),
                shift: Shift::TurnoB,
            })
            .unwrap();
        config
            .set_config_value(config_keys::COMPLETION_THRESHOLD, "0.95")
            .unwrap();

        let backup = api.export_snapshot().unwrap();
        assert_eq!(backup.config[config_keys::COMPLETION_THRESHOLD], json!("0.95"));

        let (target, target_repos, target_config) = self::api();
        let summary = target.restore_snapshot(&backup).unwrap();
        assert_eq!(summary.config_keys, 1);
        assert_eq!(target_repos.drivers.list().unwrap().len(), 1);
        assert_eq!(target_config.get_completion_threshold().unwrap(), 0.95);
    }

    #[test]
    fn test_restore_browser_dump() {
        let (api, repos, _) = api();
        let dump = json!({
            "smart_calda_fleet": [{ "id": "ABC1D23", "maxCapacity": 15000.0, "company": "Usina" }]
        });
        let restored = api.restore_entities(&dump).unwrap();
        assert_eq!(restored.get("smart_calda_fleet"), Some(&1));
        assert_eq!(repos.trucks.list().unwrap()[0].max_capacity, 15000.0);
    }

    #[tokio::test]
    async fn test_missing_file_is_import_failure() {
        let (api, _, _) = api();
        let result = api.import_file(Path::new("/nao/existe/ATLOS.xlsx")).await;
        assert!(matches!(result, Err(ApiError::ImportParseFailure(_))));
    }
}
