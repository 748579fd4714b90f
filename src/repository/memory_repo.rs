// ==========================================
// SMART CALDA - 实体仓储内存实现
// ==========================================
// 职责: 无数据库场景（单元测试 / 临时会话）下的 EntityRepository
// ==========================================

use crate::domain::entity::StoredEntity;
use crate::engine::merge::{upsert_batch_with_stats, MergeStats};
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Mutex;

pub struct InMemoryEntityRepository<T: StoredEntity> {
    items: Mutex<Vec<T>>,
}

impl<T: StoredEntity> InMemoryEntityRepository<T> {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(items: Vec<T>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<Vec<T>>> {
        self.items
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl<T: StoredEntity> Default for InMemoryEntityRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoredEntity> EntityRepository<T> for InMemoryEntityRepository<T> {
    fn list(&self) -> RepositoryResult<Vec<T>> {
        Ok(self.lock()?.clone())
    }

    fn get(&self, id: &str) -> RepositoryResult<Option<T>> {
        Ok(self.lock()?.iter().find(|e| e.key() == id).cloned())
    }

    fn put(&self, entity: &T) -> RepositoryResult<()> {
        let mut items = self.lock()?;
        match items.iter_mut().find(|e| e.key() == entity.key()) {
            Some(slot) => *slot = entity.clone(),
            None => items.push(entity.clone()),
        }
        Ok(())
    }

    fn upsert_batch(&self, incoming: Vec<T>) -> RepositoryResult<MergeStats> {
        let mut items = self.lock()?;
        let existing = std::mem::take(&mut *items);
        let (merged, stats) = upsert_batch_with_stats(existing, incoming, |e: &T| e.key().to_string());
        *items = merged;
        Ok(stats)
    }

    fn remove(&self, id: &str) -> RepositoryResult<bool> {
        let mut items = self.lock()?;
        let before = items.len();
        items.retain(|e| e.key() != id);
        Ok(items.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::master_data::Supervisor;

    fn supervisor(id: &str, name: &str) -> Supervisor {
        Supervisor {
            id: id.to_string(),
            name: name.to_string(),
            work_front: String::new(),
        }
    }

    #[test]
    fn test_in_memory_upsert_semantics() {
        let repo = InMemoryEntityRepository::with_items(vec![supervisor("77", "João")]);
        let stats = repo
            .upsert_batch(vec![supervisor("88", "Maria"), supervisor("77", "João Silva")])
            .unwrap();
        assert_eq!(stats, MergeStats { inserted: 1, updated: 1 });

        let all = repo.list().unwrap();
        assert_eq!(all[0].name, "João Silva");
        assert_eq!(all[1].id, "88");
    }
}
