// ==========================================
// SMART CALDA - 实体仓储接口
// ==========================================
// 职责: 定义每类实体的 get / put / upsertBatch 接口（不包含实现）
// 红线: Repository 不含业务规则，只做集合存取
// ==========================================

use crate::domain::entity::StoredEntity;
use crate::engine::merge::MergeStats;
use crate::repository::error::RepositoryResult;

// ==========================================
// EntityRepository Trait
// ==========================================
// 实现者: SqliteEntityRepository（entity_store 表）, InMemoryEntityRepository（测试/临时）
pub trait EntityRepository<T: StoredEntity>: Send + Sync {
    /// 全量读取（插入顺序）
    fn list(&self) -> RepositoryResult<Vec<T>>;

    /// 按自然键读取
    fn get(&self, id: &str) -> RepositoryResult<Option<T>>;

    /// 单条 upsert（已有键保持原位置）
    fn put(&self, entity: &T) -> RepositoryResult<()>;

    /// 批量 upsert（一次导入每个集合只调用一次）
    fn upsert_batch(&self, incoming: Vec<T>) -> RepositoryResult<MergeStats>;

    /// 按自然键删除，返回是否存在
    fn remove(&self, id: &str) -> RepositoryResult<bool>;

    fn count(&self) -> RepositoryResult<usize> {
        Ok(self.list()?.len())
    }

    /// 按自然键读取，不存在时报 NotFound
    fn require(&self, id: &str) -> RepositoryResult<T> {
        self.get(id)?
            .ok_or_else(|| crate::repository::error::RepositoryError::NotFound {
                entity: T::ENTITY_NAME.to_string(),
                id: id.to_string(),
            })
    }
}
