// ==========================================
// SMART CALDA - 作业导入实现
// ==========================================
// 职责: 工作簿 → ServiceOrderLine / 主数据 / 车次，批量落库
// 红线: 每个 O.S. 至多生成一次车次；每个集合每次导入只 upsert 一次
// 说明: 非原子导入，失败前已提交的集合不回滚
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::config::config_manager::config_keys;
use crate::domain::master_data::{Driver, Location, Resource, Section, Supervisor};
use crate::domain::operation::ServiceOrderLine;
use crate::domain::types::{normalize_text, OperationStatus, Shift, TripStatus};
use crate::engine::merge::FirstSeen;
use crate::engine::partitioner::{round_decimals, VolumePartitioner};
use crate::engine::reconciler::{StatusIndex, TripStatusReconciler};
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{FieldMapper, SecondarySheetMapping};
use crate::importer::file_parser::{SheetGrid, UniversalFileParser, Workbook};
use crate::importer::operation_importer_trait::OperationImporter;
use crate::repository::repositories::EntityRepositories;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 司机表名称（按顺序尝试）
pub const DRIVER_SHEET_NAMES: [&str; 2] = ["Motoristas", "Drivers"];

/// 导入汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub rows_read: usize,
    pub operations: usize,
    pub resources: usize,
    pub sections: usize,
    pub locations: usize,
    pub supervisors: usize,
    pub drivers: usize,
    pub os_with_trips: usize,
    pub trips_generated: usize,
    pub elapsed_ms: u64,
}

impl ImportSummary {
    /// 本地化汇总消息
    pub fn message(&self) -> String {
        t_with_args(
            "import.summary",
            &[
                ("operations", self.operations.to_string().as_str()),
                ("trips", self.trips_generated.to_string().as_str()),
                ("os", self.os_with_trips.to_string().as_str()),
                ("drivers", self.drivers.to_string().as_str()),
            ],
        )
    }
}

/// 司机表导入汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverImportSummary {
    pub rows_read: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// 单次导入参数（配置快照）
struct ImportSettings {
    start_row: usize,
    unmatched_status: TripStatus,
    delivery_shift: Shift,
    mapping: SecondarySheetMapping,
}

// ==========================================
// OperationImporterImpl
// ==========================================
pub struct OperationImporterImpl<C>
where
    C: ImportConfigReader,
{
    repos: EntityRepositories,
    config: Arc<C>,
    file_parser: UniversalFileParser,
    field_mapper: FieldMapper,
    partitioner: VolumePartitioner,
    reconciler: TripStatusReconciler,
}

impl<C> OperationImporterImpl<C>
where
    C: ImportConfigReader,
{
    pub fn new(repos: EntityRepositories, config: Arc<C>) -> Self {
        Self {
            repos,
            config,
            file_parser: UniversalFileParser,
            field_mapper: FieldMapper::new(),
            partitioner: VolumePartitioner::new(),
            reconciler: TripStatusReconciler::new(),
        }
    }

    async fn load_settings(&self) -> ImportResult<ImportSettings> {
        let start_row = self
            .config
            .get_primary_data_start_row()
            .await
            .map_err(|e| config_error(config_keys::PRIMARY_DATA_START_ROW, e))?;
        let unmatched_status = self
            .config
            .get_unmatched_trip_status()
            .await
            .map_err(|e| config_error(config_keys::UNMATCHED_TRIP_STATUS, e))?;
        let delivery_shift = self
            .config
            .get_default_delivery_shift()
            .await
            .map_err(|e| config_error(config_keys::DEFAULT_DELIVERY_SHIFT, e))?;
        let mapping = self
            .config
            .get_secondary_sheet_mapping()
            .await
            .map_err(|e| config_error(config_keys::SECONDARY_SHEET_MAPPING, e))?;

        Ok(ImportSettings {
            start_row,
            unmatched_status,
            delivery_shift,
            mapping,
        })
    }

    /// 副表 → 状态索引（只有一张表时返回空索引）
    fn build_index(&self, workbook: &Workbook, mapping: &SecondarySheetMapping) -> ImportResult<StatusIndex> {
        match workbook.sheet(1) {
            Some(sheet) if !is_driver_sheet(sheet) => {
                let records = self.field_mapper.map_secondary_sheet(sheet, mapping)?;
                Ok(self.reconciler.build_status_index(&records))
            }
            _ => {
                warn!("工作簿无副表，车次状态与药罐数据为空");
                Ok(StatusIndex::new())
            }
        }
    }
}

fn config_error(key: &str, err: Box<dyn std::error::Error + Send + Sync>) -> ImportError {
    ImportError::ConfigReadError {
        key: key.to_string(),
        message: err.to_string(),
    }
}

fn is_driver_sheet(sheet: &SheetGrid) -> bool {
    let name = normalize_text(&sheet.name);
    DRIVER_SHEET_NAMES
        .iter()
        .any(|candidate| normalize_text(candidate) == name)
}

/// 已解析的主表结果（尚未落库）
#[derive(Default)]
struct PrimaryExtraction {
    rows_read: usize,
    operations: Vec<ServiceOrderLine>,
    resources: FirstSeen<Resource>,
    sections: FirstSeen<Section>,
    locations: FirstSeen<Location>,
    supervisors: FirstSeen<Supervisor>,
    os_with_trips: usize,
    trips_generated: usize,
}

impl<C> OperationImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 主表逐行提取
    fn extract_primary(
        &self,
        sheet: &SheetGrid,
        index: &StatusIndex,
        settings: &ImportSettings,
        created_at: &HashMap<String, DateTime<Utc>>,
        today: NaiveDate,
    ) -> PrimaryExtraction {
        let mut out = PrimaryExtraction::default();
        let mut processed_os: HashSet<String> = HashSet::new();
        let mut line_positions: HashMap<String, usize> = HashMap::new();
        let mut data_index = 0usize;

        for row in settings.start_row..sheet.row_count() {
            // 空白行不计入行序号
            if sheet.is_blank_row(row) {
                continue;
            }
            let position = data_index;
            data_index += 1;
            out.rows_read += 1;

            let Some(record) = self.field_mapper.map_primary_row(sheet, row) else {
                continue;
            };

            // 主数据：首见优先
            out.resources.offer(&record.resource_id, || Resource {
                id: record.resource_id.clone(),
                name: record.resource_name.clone(),
            });
            out.sections.offer(&record.section_id, || Section {
                id: record.section_id.clone(),
                name: record.section_name.clone(),
            });
            out.locations.offer(&record.location_id, || Location {
                id: record.location_id.clone(),
                sector_name: record.sector_name.clone(),
                section_id: Some(record.section_id.clone()).filter(|s| !s.is_empty()),
                farm_description: None,
            });
            out.supervisors.offer(&record.supervisor_id, || Supervisor {
                id: record.supervisor_id.clone(),
                name: record.supervisor_name.clone(),
                work_front: String::new(),
            });

            let tank = index.tank_metadata(&record.os_code).unwrap_or_default();
            let application_total = if record.production_area > 0.0 && tank.flow_rate > 0.0 {
                record.production_area * tank.flow_rate
            } else {
                0.0
            };

            let id_suffix = if record.resource_id.is_empty() {
                position.to_string()
            } else {
                record.resource_id.clone()
            };
            let mut line = ServiceOrderLine::new(
                format!("{}-{}", record.os_code, id_suffix),
                record.os_code.clone(),
            );

            // 车次：每个 O.S. 只生成一次
            if application_total > 0.0
                && tank.tank_capacity > 0.0
                && !processed_os.contains(&record.os_code)
            {
                match self.partitioner.partition(
                    application_total,
                    tank.tank_capacity,
                    today,
                    settings.delivery_shift,
                ) {
                    Ok(mut trips) => {
                        let matched = self.reconciler.apply_status_index(
                            &mut trips,
                            &record.os_code,
                            index,
                            Some(settings.unmatched_status),
                        );
                        debug!(
                            os_code = %record.os_code,
                            trips = trips.len(),
                            matched = matched,
                            "O.S. 车次生成"
                        );
                        out.os_with_trips += 1;
                        out.trips_generated += trips.len();
                        line.volumes = trips;
                    }
                    Err(e) => {
                        warn!(os_code = %record.os_code, error = %e, "车次生成失败，跳过");
                    }
                }
                processed_os.insert(record.os_code.clone());
            }

            line.operation_number = record.operation_number;
            line.operation_description = record.operation_description;
            line.resource_id = record.resource_id;
            line.resource_name = Some(record.resource_name).filter(|s| !s.is_empty());
            line.supervisor_id = record.supervisor_id;
            line.section_id = record.section_id;
            line.location_id = record.location_id;
            line.production_area = record.production_area;
            line.flow_rate = record.dose_flow_rate;
            line.target_volume = record.target_volume;
            line.issue_date = record.issue_date;
            line.os_age = record.os_age;
            line.os_situation = record.os_situation;
            line.application_area = Some(record.production_area);
            line.application_flow_rate = Some(tank.flow_rate);
            line.application_total_volume = Some(round_decimals(application_total, 2));
            line.truck_capacity = Some(tank.tank_capacity);
            line.status = OperationStatus::Mixing;
            if let Some(original) = created_at.get(&line.id) {
                line.created_at = *original;
            }

            // 同 id 的后续行覆盖前行，但车次属于 O.S.，不能随前行丢失
            match line_positions.get(&line.id) {
                Some(&pos) => {
                    let previous = &mut out.operations[pos];
                    if line.volumes.is_empty() {
                        line.volumes = std::mem::take(&mut previous.volumes);
                    }
                    debug!(id = %line.id, "重复作业行，后行覆盖");
                    *previous = line;
                }
                None => {
                    line_positions.insert(line.id.clone(), out.operations.len());
                    out.operations.push(line);
                }
            }
        }

        out
    }
}

#[async_trait::async_trait]
impl<C> OperationImporter for OperationImporterImpl<C>
where
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, file_path))]
    async fn import_from_file<P: AsRef<Path> + Send>(&self, file_path: P) -> ImportResult<ImportSummary> {
        let path = file_path.as_ref();
        info!(file_path = %path.display(), "开始导入作业表");

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let workbook = self.file_parser.parse(path).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        info!(sheets = workbook.sheet_count(), "文件解析完成");

        self.import_workbook(&workbook).await
    }

    #[instrument(skip(self, workbook), fields(sheets = workbook.sheet_count()))]
    async fn import_workbook(&self, workbook: &Workbook) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();

        // === 步骤 2: 读取导入配置 ===
        debug!("步骤 2: 读取导入配置");
        let settings = self.load_settings().await?;

        // === 步骤 3: 副表状态索引 ===
        debug!("步骤 3: 副表状态索引");
        let index = self.build_index(workbook, &settings.mapping)?;
        info!(entries = index.len(), os_count = index.os_count(), "副表解析完成");

        // === 步骤 4: 主表提取 ===
        debug!("步骤 4: 主表提取");
        let primary = workbook
            .sheet(0)
            .ok_or_else(|| ImportError::SheetNotFound("1".to_string()))?;
        let created_at: HashMap<String, DateTime<Utc>> = self
            .repos
            .operations
            .list()?
            .into_iter()
            .map(|op| (op.id, op.created_at))
            .collect();
        let today = Utc::now().date_naive();
        let extraction = self.extract_primary(primary, &index, &settings, &created_at, today);
        info!(
            rows = extraction.rows_read,
            operations = extraction.operations.len(),
            trips = extraction.trips_generated,
            "主表提取完成"
        );

        // === 步骤 5: 批量落库 ===
        debug!("步骤 5: 批量落库");
        let mut summary = ImportSummary {
            rows_read: extraction.rows_read,
            operations: extraction.operations.len(),
            resources: extraction.resources.len(),
            sections: extraction.sections.len(),
            locations: extraction.locations.len(),
            supervisors: extraction.supervisors.len(),
            os_with_trips: extraction.os_with_trips,
            trips_generated: extraction.trips_generated,
            ..ImportSummary::default()
        };

        if !extraction.resources.is_empty() {
            self.repos.resources.upsert_batch(extraction.resources.into_vec())?;
        }
        if !extraction.sections.is_empty() {
            self.repos.sections.upsert_batch(extraction.sections.into_vec())?;
        }
        if !extraction.locations.is_empty() {
            self.repos.locations.upsert_batch(extraction.locations.into_vec())?;
        }
        if !extraction.supervisors.is_empty() {
            self.repos.supervisors.upsert_batch(extraction.supervisors.into_vec())?;
        }
        if !extraction.operations.is_empty() {
            let stats = self.repos.operations.upsert_batch(extraction.operations)?;
            debug!(inserted = stats.inserted, updated = stats.updated, "作业行落库");
        }

        // === 步骤 6: 司机表 ===
        debug!("步骤 6: 司机表");
        if let Some(drivers) = self.import_drivers(workbook).await? {
            summary.drivers = drivers.inserted;
        }

        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            operations = summary.operations,
            trips = summary.trips_generated,
            elapsed_ms = summary.elapsed_ms,
            "作业表导入完成"
        );
        Ok(summary)
    }

    #[instrument(skip(self, workbook))]
    async fn import_drivers(&self, workbook: &Workbook) -> ImportResult<Option<DriverImportSummary>> {
        let Some(sheet) = workbook.sheet_by_name(&DRIVER_SHEET_NAMES) else {
            return Ok(None);
        };
        if sheet.row_count() == 0 {
            return Ok(Some(DriverImportSummary::default()));
        }

        let headers: Vec<String> = sheet.row(0).iter().map(|c| c.as_text()).collect();
        let find_column = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| normalize_text(h) == *n))
        };
        let name_col = find_column(&["nome", "name"]).ok_or_else(|| ImportError::MissingColumn {
            sheet: sheet.name.clone(),
            role: "Nome".to_string(),
            headers: headers.clone(),
        })?;
        let shift_col = find_column(&["turno", "shift"]);

        let mut known: HashSet<String> = self
            .repos
            .drivers
            .list()?
            .iter()
            .map(|d| normalize_text(&d.name))
            .collect();

        let mut summary = DriverImportSummary::default();
        let mut new_drivers = Vec::new();
        for row in 1..sheet.row_count() {
            let name = sheet.cell(row, name_col).as_text().trim().to_string();
            if name.is_empty() {
                continue;
            }
            summary.rows_read += 1;

            if !known.insert(normalize_text(&name)) {
                summary.skipped += 1;
                continue;
            }

            let shift = shift_col
                .and_then(|col| Shift::parse(&sheet.cell(row, col).as_text()))
                .unwrap_or_default();
            new_drivers.push(Driver {
                id: Uuid::new_v4().to_string(),
                name,
                shift,
            });
        }

        summary.inserted = new_drivers.len();
        if !new_drivers.is_empty() {
            self.repos.drivers.upsert_batch(new_drivers)?;
        }
        info!(inserted = summary.inserted, skipped = summary.skipped, "司机表导入完成");
        Ok(Some(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResult;
    use async_trait::async_trait;

    struct FixedConfig;

    #[async_trait]
    impl ImportConfigReader for FixedConfig {
        async fn get_primary_data_start_row(&self) -> ConfigResult<usize> {
            Ok(2)
        }
        async fn get_unmatched_trip_status(&self) -> ConfigResult<TripStatus> {
            Ok(TripStatus::Unknown)
        }
        async fn get_default_delivery_shift(&self) -> ConfigResult<Shift> {
            Ok(Shift::TurnoA)
        }
        async fn get_secondary_sheet_mapping(&self) -> ConfigResult<SecondarySheetMapping> {
            Ok(SecondarySheetMapping::default())
        }
        async fn get_spreadsheet_url(&self) -> ConfigResult<String> {
            Ok(String::new())
        }
    }

    fn primary_row(op: &str, os: &str, resource: &str, area: &str) -> Vec<String> {
        let mut row = vec![String::new(); 19];
        row[0] = op.to_string();
        row[2] = os.to_string();
        row[3] = resource.to_string();
        row[9] = "SUP1".to_string();
        row[10] = "Joao".to_string();
        row[11] = area.to_string();
        row
    }

    fn text_row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn workbook() -> Workbook {
        let primary = SheetGrid::from_text_rows(
            "Planilha1",
            &[
                text_row(&["Relatorio"]),
                text_row(&["A", "B", "C"]),
                primary_row("10", "308710", "R1", "10"),
                primary_row("10", "308710", "R2", "10"),
                primary_row("10", "308710", "R3", "10"),
                primary_row("11", "", "R4", "5"),
            ],
        );
        let secondary = SheetGrid::from_text_rows(
            "Planilha2",
            &[
                vec!["OS", "Vazão", "Capacidade", "1º carga", "2º carga"],
                vec!["308710", "100", "400", "ENTREGUE", ""],
            ],
        );
        let drivers = SheetGrid::from_text_rows(
            "Motoristas",
            &[vec!["Nome", "Turno"], vec!["Carlos", "Turno B"], vec!["carlos", ""], vec!["Ana", ""]],
        );
        Workbook::new(vec![primary, secondary, drivers])
    }

    #[tokio::test]
    async fn test_trips_generated_once_per_os() {
        let repos = EntityRepositories::in_memory();
        let importer = OperationImporterImpl::new(repos.clone(), Arc::new(FixedConfig));

        let summary = importer.import_workbook(&workbook()).await.unwrap();
        assert_eq!(summary.operations, 3);
        assert_eq!(summary.os_with_trips, 1);
        // 10 ha × 100 L/ha = 1000 L，罐容 400 → 400/400/200
        assert_eq!(summary.trips_generated, 3);
        assert_eq!(summary.drivers, 2);

        let ops = repos.operations.list().unwrap();
        let trip_total: usize = ops.iter().map(|op| op.volumes.len()).sum();
        assert_eq!(trip_total, 3);
        assert_eq!(ops[0].id, "308710-R1");
        assert_eq!(ops[0].application_total_volume, Some(1000.0));

        let statuses: Vec<TripStatus> = ops[0].volumes.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![TripStatus::Delivered, TripStatus::Unknown, TripStatus::Unknown]
        );
        assert_eq!(repos.supervisors.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeated_line_id_keeps_generated_trips() {
        let repos = EntityRepositories::in_memory();
        let importer = OperationImporterImpl::new(repos.clone(), Arc::new(FixedConfig));

        let primary = SheetGrid::from_text_rows(
            "Planilha1",
            &[
                text_row(&["Relatorio"]),
                text_row(&["A", "B", "C"]),
                primary_row("10", "308710", "R1", "10"),
                primary_row("10", "308710", "R1", "10"),
            ],
        );
        let secondary = SheetGrid::from_text_rows(
            "Planilha2",
            &[
                vec!["OS", "Vazão", "Capacidade", "1º carga"],
                vec!["308710", "100", "400", "ENTREGUE"],
            ],
        );

        let summary = importer
            .import_workbook(&Workbook::new(vec![primary, secondary]))
            .await
            .unwrap();
        assert_eq!(summary.operations, 1);
        assert_eq!(summary.trips_generated, 3);

        let stored = repos.operations.require("308710-R1").unwrap();
        assert_eq!(stored.volumes.len(), summary.trips_generated);
        assert_eq!(stored.volumes[0].status, TripStatus::Delivered);
    }

    #[tokio::test]
    async fn test_reimport_keeps_created_at() {
        let repos = EntityRepositories::in_memory();
        let importer = OperationImporterImpl::new(repos.clone(), Arc::new(FixedConfig));

        importer.import_workbook(&workbook()).await.unwrap();
        let first = repos.operations.require("308710-R2").unwrap();

        let summary = importer.import_workbook(&workbook()).await.unwrap();
        let second = repos.operations.require("308710-R2").unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(repos.operations.count().unwrap(), 3);
        // 司机按姓名去重，二次导入不新增
        assert_eq!(summary.drivers, 0);
        assert_eq!(repos.drivers.count().unwrap(), 2);
    }
}
