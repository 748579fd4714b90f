// ==========================================
// SMART CALDA - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供实体集合存取接口,屏蔽存储细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod entity_repo;
pub mod entity_repo_impl;
pub mod error;
pub mod memory_repo;
pub mod repositories;
pub mod snapshot;

// 重导出核心仓储
pub use entity_repo::EntityRepository;
pub use entity_repo_impl::SqliteEntityRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use memory_repo::InMemoryEntityRepository;
pub use repositories::EntityRepositories;
pub use snapshot::SnapshotService;
