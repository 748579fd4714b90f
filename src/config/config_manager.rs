// ==========================================
// SMART CALDA - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::config::ConfigResult;
use crate::db::open_sqlite_connection;
use crate::domain::types::{Shift, TripStatus};
use crate::engine::classification::DEFAULT_COMPLETION_THRESHOLD;
use crate::engine::daily_report::DEFAULT_RATE_DEVIATION_PCT;
use crate::engine::metrics::DEFAULT_TOP_OPERATION_TYPES;
use crate::importer::field_mapper::SecondarySheetMapping;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const SPREADSHEET_URL: &str = "spreadsheet_url";
    pub const LOGO_URL: &str = "logo_url";
    pub const COMPLETION_THRESHOLD: &str = "completion_threshold";
    pub const UNMATCHED_TRIP_STATUS: &str = "unmatched_trip_status";
    pub const PRIMARY_DATA_START_ROW: &str = "primary_data_start_row";
    pub const TOP_OPERATION_TYPES: &str = "top_operation_types";
    pub const RATE_DEVIATION_PCT: &str = "rate_deviation_pct";
    pub const DEFAULT_DELIVERY_SHIFT: &str = "default_delivery_shift";
    pub const SECONDARY_SHEET_MAPPING: &str = "secondary_sheet_mapping";
}

/// 默认远程表格
pub const DEFAULT_SPREADSHEET_URL: &str =
    "https://hfbamksgmwbczqvnzuql.supabase.co/storage/v1/object/public/ATLOS/ATLOS.xlsx";

/// 默认 Logo
pub const DEFAULT_LOGO_URL: &str =
    "https://hfbamksgmwbczqvnzuql.supabase.co/storage/v1/object/public/ATLOS/logo.png";

/// 默认主表数据起始行
pub const DEFAULT_PRIMARY_DATA_START_ROW: usize = 2;

/// 看板配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSettings {
    pub completion_threshold: f64,
    pub top_operation_types: usize,
    pub rate_deviation_pct: f64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            top_operation_types: DEFAULT_TOP_OPERATION_TYPES,
            rate_deviation_pct: DEFAULT_RATE_DEVIATION_PCT,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("Falha no bloqueio: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("Falha no bloqueio: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置；无法解析时记录告警并回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().replace(',', ".").parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(key = key, value = %raw, "配置值无法解析，使用默认值 {}", default);
                    Ok(default)
                }
            },
        }
    }

    /// 写入配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("Falha no bloqueio: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("Falha no bloqueio: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("Falha no bloqueio: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    // ===== 看板配置 =====

    /// 完成阈值
    ///
    /// # 默认值
    /// - 0.99
    pub fn get_completion_threshold(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(config_keys::COMPLETION_THRESHOLD, DEFAULT_COMPLETION_THRESHOLD)
    }

    /// 作业类型图条目数
    pub fn get_top_operation_types(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::TOP_OPERATION_TYPES, DEFAULT_TOP_OPERATION_TYPES)
    }

    /// 日报偏差告警阈值（百分比）
    pub fn get_rate_deviation_pct(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(config_keys::RATE_DEVIATION_PCT, DEFAULT_RATE_DEVIATION_PCT)
    }

    pub fn get_dashboard_settings(&self) -> ConfigResult<DashboardSettings> {
        Ok(DashboardSettings {
            completion_threshold: self.get_completion_threshold()?,
            top_operation_types: self.get_top_operation_types()?,
            rate_deviation_pct: self.get_rate_deviation_pct()?,
        })
    }

    pub fn get_logo_url(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::LOGO_URL, DEFAULT_LOGO_URL)
    }
}

// ==========================================
// ImportConfigReader 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_primary_data_start_row(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(
            config_keys::PRIMARY_DATA_START_ROW,
            DEFAULT_PRIMARY_DATA_START_ROW,
        )
    }

    async fn get_unmatched_trip_status(&self) -> ConfigResult<TripStatus> {
        let raw = self.get_config_or_default(
            config_keys::UNMATCHED_TRIP_STATUS,
            TripStatus::UNKNOWN_LABEL,
        )?;
        Ok(TripStatus::from_free_text(&raw))
    }

    async fn get_default_delivery_shift(&self) -> ConfigResult<Shift> {
        let raw = self.get_config_or_default(config_keys::DEFAULT_DELIVERY_SHIFT, "Turno A")?;
        Ok(Shift::parse(&raw).unwrap_or_default())
    }

    async fn get_secondary_sheet_mapping(&self) -> ConfigResult<SecondarySheetMapping> {
        match self.get_config_value(config_keys::SECONDARY_SHEET_MAPPING)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(SecondarySheetMapping::default()),
        }
    }

    async fn get_spreadsheet_url(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::SPREADSHEET_URL, DEFAULT_SPREADSHEET_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_rows() {
        let config = manager();
        let settings = config.get_dashboard_settings().unwrap();
        assert_eq!(settings, DashboardSettings::default());
        assert_eq!(settings.completion_threshold, 0.99);
    }

    #[test]
    fn test_override_and_snapshot() {
        let config = manager();
        config.set_config_value(config_keys::COMPLETION_THRESHOLD, "1,0").unwrap();
        config.set_config_value(config_keys::TOP_OPERATION_TYPES, "oito").unwrap();
        assert_eq!(config.get_completion_threshold().unwrap(), 1.0);
        assert_eq!(config.get_top_operation_types().unwrap(), DEFAULT_TOP_OPERATION_TYPES);

        let snapshot = config.get_config_snapshot().unwrap();
        let other = manager();
        assert_eq!(other.restore_config_from_snapshot(&snapshot).unwrap(), 2);
        assert_eq!(other.get_completion_threshold().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_import_reader_defaults() {
        let config = manager();
        assert_eq!(config.get_primary_data_start_row().await.unwrap(), 2);
        assert_eq!(config.get_unmatched_trip_status().await.unwrap(), TripStatus::Unknown);
        assert_eq!(config.get_default_delivery_shift().await.unwrap(), Shift::TurnoA);
        assert_eq!(
            config.get_secondary_sheet_mapping().await.unwrap(),
            SecondarySheetMapping::default()
        );

        config
            .set_config_value(config_keys::UNMATCHED_TRIP_STATUS, "DISPONIVEL")
            .unwrap();
        assert_eq!(config.get_unmatched_trip_status().await.unwrap(), TripStatus::Available);
    }
}
