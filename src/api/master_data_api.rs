// ==========================================
// SMART CALDA - 主数据 API
// ==========================================
// 职责: 司机 / 负责人 / 车辆 / 区域 / 工段 / 产品 的增删改查
// 规则: 新建时姓名（司机、负责人）或编号（车辆、区域）已存在
//       返回 DuplicateNameConflict，由调用方切换到编辑已有记录
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::entity::StoredEntity;
use crate::domain::master_data::{Driver, Location, Resource, Section, Supervisor, Truck};
use crate::domain::types::{normalize_text, Shift};
use crate::repository::entity_repo::EntityRepository;
use crate::repository::repositories::EntityRepositories;
use tracing::info;
use uuid::Uuid;

pub struct MasterDataApi {
    repos: EntityRepositories,
}

impl MasterDataApi {
    pub fn new(repos: EntityRepositories) -> Self {
        Self { repos }
    }

    // ==========================================
    // 司机
    // ==========================================

    pub fn list_drivers(&self) -> ApiResult<Vec<Driver>> {
        Ok(self.repos.drivers.list()?)
    }

    pub fn create_driver(&self, name: &str, shift: Shift) -> ApiResult<Driver> {
        let name = required(name, "name")?;
        ensure_unique_name(self.repos.drivers.as_ref(), &name, None, |d| &d.name)?;

        let driver = Driver {
            id: Uuid::new_v4().to_string(),
            name,
            shift,
        };
        self.repos.drivers.put(&driver)?;
        info!(id = %driver.id, "新建司机");
        Ok(driver)
    }

    pub fn update_driver(&self, mut driver: Driver) -> ApiResult<Driver> {
        driver.name = required(&driver.name, "name")?;
        self.repos.drivers.require(&driver.id)?;
        ensure_unique_name(self.repos.drivers.as_ref(), &driver.name, Some(&driver.id), |d| &d.name)?;
        self.repos.drivers.put(&driver)?;
        Ok(driver)
    }

    pub fn delete_driver(&self, id: &str) -> ApiResult<bool> {
        Ok(self.repos.drivers.remove(id)?)
    }

    // ==========================================
    // 负责人
    // ==========================================

    pub fn list_supervisors(&self) -> ApiResult<Vec<Supervisor>> {
        Ok(self.repos.supervisors.list()?)
    }

    pub fn create_supervisor(&self, name: &str, work_front: &str) -> ApiResult<Supervisor> {
        let name = required(name, "name")?;
        ensure_unique_name(self.repos.supervisors.as_ref(), &name, None, |s| &s.name)?;

        let supervisor = Supervisor {
            id: Uuid::new_v4().to_string(),
            name,
            work_front: work_front.trim().to_string(),
        };
        self.repos.supervisors.put(&supervisor)?;
        info!(id = %supervisor.id, "新建负责人");
        Ok(supervisor)
    }

    pub fn update_supervisor(&self, mut supervisor: Supervisor) -> ApiResult<Supervisor> {
        supervisor.name = required(&supervisor.name, "name")?;
        self.repos.supervisors.require(&supervisor.id)?;
        ensure_unique_name(
            self.repos.supervisors.as_ref(),
            &supervisor.name,
            Some(&supervisor.id),
            |s| &s.name,
        )?;
        self.repos.supervisors.put(&supervisor)?;
        Ok(supervisor)
    }

    pub fn delete_supervisor(&self, id: &str) -> ApiResult<bool> {
        Ok(self.repos.supervisors.remove(id)?)
    }

    // ==========================================
    // 车辆（车牌为 id）
    // ==========================================

    pub fn list_trucks(&self) -> ApiResult<Vec<Truck>> {
        Ok(self.repos.trucks.list()?)
    }

    pub fn create_truck(&self, mut truck: Truck) -> ApiResult<Truck> {
        truck.id = required(&truck.id, "id")?.to_uppercase();
        validate_capacity(truck.max_capacity)?;
        ensure_new_id(self.repos.trucks.as_ref(), &truck.id)?;
        self.repos.trucks.put(&truck)?;
        Ok(truck)
    }

    pub fn update_truck(&self, truck: Truck) -> ApiResult<Truck> {
        validate_capacity(truck.max_capacity)?;
        self.repos.trucks.require(&truck.id)?;
        self.repos.trucks.put(&truck)?;
        Ok(truck)
    }

    pub fn delete_truck(&self, id: &str) -> ApiResult<bool> {
        Ok(self.repos.trucks.remove(id)?)
    }

    // ==========================================
    // 区域（Setor）
    // ==========================================

    pub fn list_locations(&self) -> ApiResult<Vec<Location>> {
        Ok(self.repos.locations.list()?)
    }

    pub fn create_location(&self, mut location: Location) -> ApiResult<Location> {
        location.id = required(&location.id, "id")?;
        location.sector_name = required(&location.sector_name, "sectorName")?;
        ensure_new_id(self.repos.locations.as_ref(), &location.id)?;
        self.repos.locations.put(&location)?;
        Ok(location)
    }

    pub fn update_location(&self, location: Location) -> ApiResult<Location> {
        self.repos.locations.require(&location.id)?;
        self.repos.locations.put(&location)?;
        Ok(location)
    }

    pub fn delete_location(&self, id: &str) -> ApiResult<bool> {
        Ok(self.repos.locations.remove(id)?)
    }

    // ==========================================
    // 工段 / 产品（导入为主，手工仅覆盖写）
    // ==========================================

    pub fn list_sections(&self) -> ApiResult<Vec<Section>> {
        Ok(self.repos.sections.list()?)
    }

    pub fn save_section(&self, mut section: Section) -> ApiResult<Section> {
        section.id = required(&section.id, "id")?;
        self.repos.sections.put(&section)?;
        Ok(section)
    }

    pub fn delete_section(&self, id: &str) -> ApiResult<bool> {
        Ok(self.repos.sections.remove(id)?)
    }

    pub fn list_resources(&self) -> ApiResult<Vec<Resource>> {
        Ok(self.repos.resources.list()?)
    }

    pub fn save_resource(&self, mut resource: Resource) -> ApiResult<Resource> {
        resource.id = required(&resource.id, "id")?;
        self.repos.resources.put(&resource)?;
        Ok(resource)
    }

    pub fn delete_resource(&self, id: &str) -> ApiResult<bool> {
        Ok(self.repos.resources.remove(id)?)
    }
}

fn required(value: &str, field: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::MissingRequiredField {
            field: field.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_capacity(capacity: f64) -> ApiResult<()> {
    if capacity.is_finite() && capacity > 0.0 {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "capacidade máxima deve ser maior que zero: {}",
            capacity
        )))
    }
}

/// 姓名重复检查（忽略大小写与重音，排除自身）
fn ensure_unique_name<T, F>(
    repo: &dyn EntityRepository<T>,
    name: &str,
    own_id: Option<&str>,
    name_of: F,
) -> ApiResult<()>
where
    T: StoredEntity,
    F: Fn(&T) -> &String,
{
    let wanted = normalize_text(name);
    let existing = repo.list()?;
    match existing
        .iter()
        .find(|item| normalize_text(name_of(item)) == wanted && Some(item.key()) != own_id)
    {
        Some(duplicate) => Err(ApiError::DuplicateNameConflict {
            entity: T::ENTITY_NAME.to_string(),
            name: name.to_string(),
            existing_id: duplicate.key().to_string(),
        }),
        None => Ok(()),
    }
}

fn ensure_new_id<T: StoredEntity>(repo: &dyn EntityRepository<T>, id: &str) -> ApiResult<()> {
    match repo.get(id)? {
        Some(_) => Err(ApiError::DuplicateNameConflict {
            entity: T::ENTITY_NAME.to_string(),
            name: id.to_string(),
            existing_id: id.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> MasterDataApi {
        MasterDataApi::new(EntityRepositories::in_memory())
    }

    #[test]
    fn test_duplicate_driver_name_offers_existing_id() {
        let api = api();
        let carlos = api.create_driver("Carlos Souza", Shift::TurnoA).unwrap();

        let err = api.create_driver("  carlos souza ", Shift::TurnoB).unwrap_err();
        match err {
            ApiError::DuplicateNameConflict { existing_id, .. } => assert_eq!(existing_id, carlos.id),
            other => panic!("erro inesperado: {other}"),
        }
        assert_eq!(api.list_drivers().unwrap().len(), 1);
    }

    #[test]
    fn test_update_driver_may_keep_own_name() {
        let api = api();
        let mut carlos = api.create_driver("Carlos", Shift::TurnoA).unwrap();
        let ana = api.create_driver("Ana", Shift::TurnoA).unwrap();

        carlos.shift = Shift::TurnoC;
        assert_eq!(api.update_driver(carlos.clone()).unwrap().shift, Shift::TurnoC);

        let mut renamed = ana.clone();
        renamed.name = "CARLOS".to_string();
        assert!(matches!(
            api.update_driver(renamed),
            Err(ApiError::DuplicateNameConflict { .. })
        ));
    }

    #[test]
    fn test_supervisor_blank_name_is_missing_field() {
        let api = api();
        assert!(matches!(
            api.create_supervisor("   ", "Frente 1"),
            Err(ApiError::MissingRequiredField { .. })
        ));
        api.create_supervisor("João", "Frente 1").unwrap();
        assert!(matches!(
            api.create_supervisor("joao", ""),
            Err(ApiError::DuplicateNameConflict { .. })
        ));
    }

    #[test]
    fn test_truck_plate_conflict_and_capacity() {
        let api = api();
        let truck = Truck {
            id: "abc1d23".to_string(),
            max_capacity: 15000.0,
            company: "Usina".to_string(),
        };
        assert_eq!(api.create_truck(truck.clone()).unwrap().id, "ABC1D23");

        let mut same_plate = truck.clone();
        same_plate.id = "ABC1D23".to_string();
        assert!(matches!(
            api.create_truck(same_plate),
            Err(ApiError::DuplicateNameConflict { ref existing_id, .. }) if existing_id == "ABC1D23"
        ));

        let mut empty_tank = truck;
        empty_tank.id = "XYZ9K88".to_string();
        empty_tank.max_capacity = 0.0;
        assert!(matches!(api.create_truck(empty_tank), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_location_crud() {
        let api = api();
        let location = Location {
            id: "S10".to_string(),
            sector_name: "Setor 10".to_string(),
            section_id: Some("F1".to_string()),
            farm_description: None,
        };
        api.create_location(location.clone()).unwrap();
        assert!(matches!(
            api.create_location(location.clone()),
            Err(ApiError::DuplicateNameConflict { .. })
        ));

        let mut renamed = location;
        renamed.sector_name = "Setor Dez".to_string();
        api.update_location(renamed).unwrap();
        assert_eq!(api.list_locations().unwrap()[0].sector_name, "Setor Dez");
        assert!(api.delete_location("S10").unwrap());
        assert!(!api.delete_location("S10").unwrap());
    }
}
