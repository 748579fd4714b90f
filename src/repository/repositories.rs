// ==========================================
// SMART CALDA - 仓储集合
// ==========================================
// 职责: 聚合所有实体仓储，供导入器 / API 统一注入
// ==========================================

use crate::domain::master_data::{Driver, Location, Resource, Section, Supervisor, Truck};
use crate::domain::operation::ServiceOrderLine;
use crate::repository::entity_repo::EntityRepository;
use crate::repository::entity_repo_impl::SqliteEntityRepository;
use crate::repository::memory_repo::InMemoryEntityRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct EntityRepositories {
    pub drivers: Arc<dyn EntityRepository<Driver>>,
    pub supervisors: Arc<dyn EntityRepository<Supervisor>>,
    pub trucks: Arc<dyn EntityRepository<Truck>>,
    pub locations: Arc<dyn EntityRepository<Location>>,
    pub resources: Arc<dyn EntityRepository<Resource>>,
    pub sections: Arc<dyn EntityRepository<Section>>,
    pub operations: Arc<dyn EntityRepository<ServiceOrderLine>>,
}

impl EntityRepositories {
    /// 基于共享 SQLite 连接创建
    pub fn sqlite(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            drivers: Arc::new(SqliteEntityRepository::new(conn.clone())),
            supervisors: Arc::new(SqliteEntityRepository::new(conn.clone())),
            trucks: Arc::new(SqliteEntityRepository::new(conn.clone())),
            locations: Arc::new(SqliteEntityRepository::new(conn.clone())),
            resources: Arc::new(SqliteEntityRepository::new(conn.clone())),
            sections: Arc::new(SqliteEntityRepository::new(conn.clone())),
            operations: Arc::new(SqliteEntityRepository::new(conn)),
        }
    }

    /// 内存实现（测试用）
    pub fn in_memory() -> Self {
        Self {
            drivers: Arc::new(InMemoryEntityRepository::new()),
            supervisors: Arc::new(InMemoryEntityRepository::new()),
            trucks: Arc::new(InMemoryEntityRepository::new()),
            locations: Arc::new(InMemoryEntityRepository::new()),
            resources: Arc::new(InMemoryEntityRepository::new()),
            sections: Arc::new(InMemoryEntityRepository::new()),
            operations: Arc::new(InMemoryEntityRepository::new()),
        }
    }
}
