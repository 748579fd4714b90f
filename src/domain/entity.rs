// ==========================================
// SMART CALDA - 实体集合约定
// ==========================================
// 职责: 声明每类实体的自然键与存储集合键
// 说明: 集合键与浏览器版 localStorage 键一致，快照可互通
// ==========================================

use crate::domain::master_data::{Driver, Location, Resource, Section, Supervisor, Truck};
use crate::domain::operation::ServiceOrderLine;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// 可按自然键存取的实体
pub trait StoredEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 存储集合键
    const COLLECTION: &'static str;

    /// 实体名称（日志/错误信息用）
    const ENTITY_NAME: &'static str;

    /// 自然键
    fn key(&self) -> &str;
}

pub mod collection_keys {
    pub const DRIVERS: &str = "smart_calda_drivers";
    pub const SUPERVISORS: &str = "smart_calda_supervisors";
    pub const FLEET: &str = "smart_calda_fleet";
    pub const LOCATIONS: &str = "smart_calda_locations";
    pub const RESOURCES: &str = "smart_calda_resources";
    pub const SECTIONS: &str = "smart_calda_sections";
    pub const OPERATIONS: &str = "smart_calda_operations";

    pub const ALL: [&str; 7] = [
        DRIVERS,
        SUPERVISORS,
        FLEET,
        LOCATIONS,
        RESOURCES,
        SECTIONS,
        OPERATIONS,
    ];
}

macro_rules! impl_stored_entity {
    ($ty:ty, $collection:expr, $name:expr) => {
        impl StoredEntity for $ty {
            const COLLECTION: &'static str = $collection;
            const ENTITY_NAME: &'static str = $name;

            fn key(&self) -> &str {
                &self.id
            }
        }
    };
}

impl_stored_entity!(Driver, collection_keys::DRIVERS, "Driver");
impl_stored_entity!(Supervisor, collection_keys::SUPERVISORS, "Supervisor");
impl_stored_entity!(Truck, collection_keys::FLEET, "Truck");
impl_stored_entity!(Location, collection_keys::LOCATIONS, "Location");
impl_stored_entity!(Resource, collection_keys::RESOURCES, "Resource");
impl_stored_entity!(Section, collection_keys::SECTIONS, "Section");
impl_stored_entity!(ServiceOrderLine, collection_keys::OPERATIONS, "ServiceOrderLine");
