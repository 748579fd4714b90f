// ==========================================
// SMART CALDA - 数据快照（备份 / 恢复）
// ==========================================
// 格式: { "<storageKey>": [ ...实体 JSON... ], ... }
// 说明: 与浏览器版 localStorage 导出一致；恢复为 upsert，不删除现有数据
// ==========================================

use crate::domain::entity::{collection_keys, StoredEntity};
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::repositories::EntityRepositories;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub struct SnapshotService {
    repos: EntityRepositories,
}

impl SnapshotService {
    pub fn new(repos: EntityRepositories) -> Self {
        Self { repos }
    }

    /// 导出所有集合
    pub fn export(&self) -> RepositoryResult<Value> {
        let mut root = Map::new();
        export_collection(&mut root, self.repos.drivers.as_ref())?;
        export_collection(&mut root, self.repos.supervisors.as_ref())?;
        export_collection(&mut root, self.repos.trucks.as_ref())?;
        export_collection(&mut root, self.repos.locations.as_ref())?;
        export_collection(&mut root, self.repos.resources.as_ref())?;
        export_collection(&mut root, self.repos.sections.as_ref())?;
        export_collection(&mut root, self.repos.operations.as_ref())?;
        Ok(Value::Object(root))
    }

    /// 恢复快照（逐集合 upsert）
    ///
    /// # 返回
    /// 集合键 → 写入条数
    pub fn restore(&self, snapshot: &Value) -> RepositoryResult<BTreeMap<String, usize>> {
        let root = snapshot
            .as_object()
            .ok_or_else(|| RepositoryError::InvalidSnapshot("raiz deve ser um objeto".to_string()))?;

        for key in root.keys() {
            if !collection_keys::ALL.contains(&key.as_str()) {
                warn!(key = %key, "快照包含未知集合，已忽略");
            }
        }

        let mut restored = BTreeMap::new();
        restore_collection(root, self.repos.drivers.as_ref(), &mut restored)?;
        restore_collection(root, self.repos.supervisors.as_ref(), &mut restored)?;
        restore_collection(root, self.repos.trucks.as_ref(), &mut restored)?;
        restore_collection(root, self.repos.locations.as_ref(), &mut restored)?;
        restore_collection(root, self.repos.resources.as_ref(), &mut restored)?;
        restore_collection(root, self.repos.sections.as_ref(), &mut restored)?;
        restore_collection(root, self.repos.operations.as_ref(), &mut restored)?;

        info!(collections = restored.len(), "快照恢复完成");
        Ok(restored)
    }
}

fn export_collection<T: StoredEntity>(
    root: &mut Map<String, Value>,
    repo: &dyn EntityRepository<T>,
) -> RepositoryResult<()> {
    let items = repo.list()?;
    root.insert(T::COLLECTION.to_string(), serde_json::to_value(items)?);
    Ok(())
}

fn restore_collection<T: StoredEntity>(
    root: &Map<String, Value>,
    repo: &dyn EntityRepository<T>,
    restored: &mut BTreeMap<String, usize>,
) -> RepositoryResult<()> {
    let Some(raw) = root.get(T::COLLECTION) else {
        return Ok(());
    };

    // localStorage 导出时值可能仍是 JSON 字符串
    let items: Vec<T> = match raw {
        Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    }
    .map_err(|e| RepositoryError::SerializationError {
        entity: T::ENTITY_NAME.to_string(),
        message: e.to_string(),
    })?;

    let count = items.len();
    repo.upsert_batch(items)?;
    restored.insert(T::COLLECTION.to_string(), count);
    Ok(())
}
