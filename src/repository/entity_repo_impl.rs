// ==========================================
// SMART CALDA - 实体仓储 SQLite 实现
// ==========================================
// 职责: 基于 entity_store 表实现 EntityRepository（使用 rusqlite）
// 存储: 每行一个实体的 camelCase JSON，position 记录集合内顺序
// ==========================================

use crate::domain::entity::StoredEntity;
use crate::engine::merge::{upsert_batch_with_stats, MergeStats};
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// SqliteEntityRepository
// ==========================================
pub struct SqliteEntityRepository<T: StoredEntity> {
    conn: Arc<Mutex<Connection>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: StoredEntity> SqliteEntityRepository<T> {
    /// 创建新的 Repository 实例（共享连接）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn decode(payload: &str) -> RepositoryResult<T> {
        serde_json::from_str(payload).map_err(|e| RepositoryError::SerializationError {
            entity: T::ENTITY_NAME.to_string(),
            message: e.to_string(),
        })
    }

    fn encode(entity: &T) -> RepositoryResult<String> {
        serde_json::to_string(entity).map_err(|e| RepositoryError::SerializationError {
            entity: T::ENTITY_NAME.to_string(),
            message: e.to_string(),
        })
    }

    fn list_with(conn: &Connection) -> RepositoryResult<Vec<T>> {
        let mut stmt = conn.prepare(
            "SELECT payload_json FROM entity_store WHERE collection = ?1 ORDER BY position, rowid",
        )?;
        let rows = stmt.query_map(params![T::COLLECTION], |row| row.get::<_, String>(0))?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(Self::decode(&row?)?);
        }
        Ok(entities)
    }
}

impl<T: StoredEntity> EntityRepository<T> for SqliteEntityRepository<T> {
    fn list(&self) -> RepositoryResult<Vec<T>> {
        let conn = self.get_conn()?;
        Self::list_with(&conn)
    }

    fn get(&self, id: &str) -> RepositoryResult<Option<T>> {
        let conn = self.get_conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload_json FROM entity_store WHERE collection = ?1 AND entity_id = ?2",
                params![T::COLLECTION, id],
                |row| row.get(0),
            )
            .optional()?;

        payload.as_deref().map(Self::decode).transpose()
    }

    fn put(&self, entity: &T) -> RepositoryResult<()> {
        let payload = Self::encode(entity)?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO entity_store (collection, entity_id, position, payload_json, updated_at)
            VALUES (
                ?1, ?2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM entity_store WHERE collection = ?1),
                ?3, datetime('now')
            )
            ON CONFLICT(collection, entity_id) DO UPDATE SET
                payload_json = excluded.payload_json,
                updated_at = excluded.updated_at
            "#,
            params![T::COLLECTION, entity.key(), payload],
        )?;
        Ok(())
    }

    fn upsert_batch(&self, incoming: Vec<T>) -> RepositoryResult<MergeStats> {
        if incoming.is_empty() {
            return Ok(MergeStats::default());
        }

        let mut conn = self.get_conn()?;
        let existing = Self::list_with(&conn)?;
        let (merged, stats) =
            upsert_batch_with_stats(existing, incoming, |e: &T| e.key().to_string());

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entity_store (collection, entity_id, position, payload_json, updated_at)
                VALUES (?1, ?2, ?3, ?4, datetime('now'))
                ON CONFLICT(collection, entity_id) DO UPDATE SET
                    position = excluded.position,
                    payload_json = excluded.payload_json,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for (position, entity) in merged.iter().enumerate() {
                stmt.execute(params![
                    T::COLLECTION,
                    entity.key(),
                    position as i64,
                    Self::encode(entity)?
                ])?;
            }
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            collection = T::COLLECTION,
            inserted = stats.inserted,
            updated = stats.updated,
            "批量 upsert 完成"
        );
        Ok(stats)
    }

    fn remove(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM entity_store WHERE collection = ?1 AND entity_id = ?2",
            params![T::COLLECTION, id],
        )?;
        Ok(affected > 0)
    }

    fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entity_store WHERE collection = ?1",
            params![T::COLLECTION],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
