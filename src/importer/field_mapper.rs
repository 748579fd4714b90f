// ==========================================
// SMART CALDA - 字段映射器实现
// ==========================================
// 职责: 主表按固定列字母映射；副表按列映射配置识别表头
// 红线: 副表必需列缺失时立即失败，不静默取 0
// ==========================================

use crate::domain::types::normalize_text;
use crate::engine::reconciler::SecondaryRecord;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{column_index, CellValue, SheetGrid};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// 主表固定列
// ==========================================
pub mod primary_columns {
    pub const OPERATION_NUMBER: &str = "A";
    pub const OPERATION_DESCRIPTION: &str = "B";
    pub const OS_CODE: &str = "C";
    pub const RESOURCE_ID: &str = "D";
    pub const RESOURCE_NAME: &str = "E";
    pub const SECTION_ID: &str = "F";
    pub const SECTION_NAME: &str = "G";
    pub const LOCATION_ID: &str = "H";
    pub const SECTOR_NAME: &str = "I";
    pub const SUPERVISOR_ID: &str = "J";
    pub const SUPERVISOR_NAME: &str = "K";
    pub const PRODUCTION_AREA: &str = "L";
    pub const DOSE_FLOW_RATE: &str = "M";
    pub const TARGET_VOLUME: &str = "N";
    pub const ISSUE_DATE: &str = "Q";
    pub const OS_AGE: &str = "R";
    pub const OS_SITUATION: &str = "S";
}

/// 主表单行（清洗后）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryRow {
    pub operation_number: String,
    pub operation_description: String,
    pub os_code: String,
    pub resource_id: String,
    pub resource_name: String,
    pub section_id: String,
    pub section_name: String,
    pub location_id: String,
    pub sector_name: String,
    pub supervisor_id: String,
    pub supervisor_name: String,
    pub production_area: f64,
    pub dose_flow_rate: f64,
    pub target_volume: f64,
    pub issue_date: String,
    pub os_age: String,
    pub os_situation: String,
}

// ==========================================
// 副表列映射配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecondarySheetMapping {
    pub os_code_keywords: Vec<String>,
    pub os_code_excludes: Vec<String>,
    pub flow_keywords: Vec<String>,
    pub capacity_keywords: Vec<String>,
    pub trip_keywords: Vec<String>,
    pub ordinal_markers: Vec<String>,
}

impl Default for SecondarySheetMapping {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            os_code_keywords: owned(&["ordem", "os"]),
            os_code_excludes: owned(&["prop"]),
            flow_keywords: owned(&["vaz", "flow"]),
            capacity_keywords: owned(&["cap", "tanque"]),
            trip_keywords: owned(&["carga", "load"]),
            ordinal_markers: owned(&["º", "ª", "°", "o", "st", "nd", "rd", "th"]),
        }
    }
}

/// 副表列解析结果（0 起始列号）
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryColumns {
    pub os_code: usize,
    pub flow_rate: usize,
    pub tank_capacity: usize,
    /// (列号, 车次序号)
    pub trips: Vec<(usize, u32)>,
}

impl SecondarySheetMapping {
    /// 表头识别车次序号（"1º carga" / "2nd load" → 1 / 2）
    pub fn trip_ordinal(&self, header: &str) -> Option<u32> {
        let normalized = normalize_text(header);
        let mut rest = normalized.as_str();

        while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
            let from_digits = &rest[start..];
            let digits_len = from_digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(from_digits.len());
            let digits = &from_digits[..digits_len];
            let after = &from_digits[digits_len..];

            if let Some(ordinal) = self.match_trip_suffix(digits, after) {
                return Some(ordinal);
            }
            rest = after;
        }
        None
    }

    fn match_trip_suffix(&self, digits: &str, after: &str) -> Option<u32> {
        // 序号标记可选，最长匹配优先
        let mut candidates: Vec<&str> = vec![after];
        for marker in &self.ordinal_markers {
            if let Some(stripped) = after.strip_prefix(marker.as_str()) {
                candidates.push(stripped);
            }
        }

        let is_trip = candidates.iter().any(|candidate| {
            let trimmed = candidate.trim_start();
            self.trip_keywords
                .iter()
                .any(|keyword| trimmed.starts_with(keyword.as_str()))
        });

        if is_trip {
            digits.parse::<u32>().ok().filter(|n| *n > 0)
        } else {
            None
        }
    }

    /// 解析表头
    ///
    /// 车次列先识别；其余表头按 O.S. → 流量 → 罐容 的顺序匹配角色，
    /// 整词命中优先于子串命中，同级取最左列
    pub fn resolve(&self, sheet: &str, headers: &[String]) -> ImportResult<SecondaryColumns> {
        let mut trips = Vec::new();
        let mut claimed: HashSet<usize> = HashSet::new();

        for (col, header) in headers.iter().enumerate() {
            if let Some(ordinal) = self.trip_ordinal(header) {
                trips.push((col, ordinal));
                claimed.insert(col);
            }
        }

        let normalized: Vec<String> = headers.iter().map(|h| normalize_text(h)).collect();

        let os_code = self
            .pick_column(&normalized, &mut claimed, &self.os_code_keywords, &self.os_code_excludes)
            .ok_or_else(|| missing(sheet, "O.S.", headers))?;
        let flow_rate = self
            .pick_column(&normalized, &mut claimed, &self.flow_keywords, &[])
            .ok_or_else(|| missing(sheet, "vazão", headers))?;
        let tank_capacity = self
            .pick_column(&normalized, &mut claimed, &self.capacity_keywords, &[])
            .ok_or_else(|| missing(sheet, "capacidade do tanque", headers))?;

        Ok(SecondaryColumns {
            os_code,
            flow_rate,
            tank_capacity,
            trips,
        })
    }

    fn pick_column(
        &self,
        normalized: &[String],
        claimed: &mut HashSet<usize>,
        keywords: &[String],
        excludes: &[String],
    ) -> Option<usize> {
        let candidates: Vec<usize> = normalized
            .iter()
            .enumerate()
            .filter(|(col, header)| {
                !claimed.contains(col)
                    && !header.is_empty()
                    && !excludes.iter().any(|ex| header.contains(ex.as_str()))
                    && keywords.iter().any(|kw| header.contains(kw.as_str()))
            })
            .map(|(col, _)| col)
            .collect();

        let exact = candidates.iter().copied().find(|col| {
            tokens(&normalized[*col]).any(|token| keywords.iter().any(|kw| kw == token))
        });

        let chosen = exact.or_else(|| candidates.first().copied())?;
        claimed.insert(chosen);
        Some(chosen)
    }
}

fn tokens(header: &str) -> impl Iterator<Item = &str> {
    header
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

fn missing(sheet: &str, role: &str, headers: &[String]) -> ImportError {
    ImportError::MissingColumn {
        sheet: sheet.to_string(),
        role: role.to_string(),
        headers: headers.to_vec(),
    }
}

// ==========================================
// FieldMapper - 行映射
// ==========================================
pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 主表单行映射；作业号 (A) 或 O.S. (C) 为空时返回 None
    pub fn map_primary_row(&self, sheet: &SheetGrid, row: usize) -> Option<PrimaryRow> {
        use primary_columns as col;

        let text = |letters: &str| self.cleaner.clean_text(sheet.cell(row, column_index(letters)));
        let number = |letters: &str| self.cleaner.parse_decimal(sheet.cell(row, column_index(letters)));

        let operation_number = text(col::OPERATION_NUMBER);
        let os_code = text(col::OS_CODE);
        if operation_number.is_empty() || os_code.is_empty() {
            return None;
        }

        Some(PrimaryRow {
            operation_number,
            operation_description: text(col::OPERATION_DESCRIPTION),
            os_code,
            resource_id: text(col::RESOURCE_ID),
            resource_name: text(col::RESOURCE_NAME),
            section_id: text(col::SECTION_ID),
            section_name: text(col::SECTION_NAME),
            location_id: text(col::LOCATION_ID),
            sector_name: text(col::SECTOR_NAME),
            supervisor_id: text(col::SUPERVISOR_ID),
            supervisor_name: text(col::SUPERVISOR_NAME),
            production_area: number(col::PRODUCTION_AREA),
            dose_flow_rate: number(col::DOSE_FLOW_RATE),
            target_volume: number(col::TARGET_VOLUME),
            issue_date: self
                .cleaner
                .format_issue_date(sheet.cell(row, column_index(col::ISSUE_DATE))),
            os_age: self
                .cleaner
                .clean_os_age(sheet.cell(row, column_index(col::OS_AGE))),
            os_situation: text(col::OS_SITUATION),
        })
    }

    /// 副表映射：首行为表头，空白行跳过，空白车次单元格不收录
    pub fn map_secondary_sheet(
        &self,
        sheet: &SheetGrid,
        mapping: &SecondarySheetMapping,
    ) -> ImportResult<Vec<SecondaryRecord>> {
        if sheet.row_count() == 0 {
            return Ok(Vec::new());
        }

        let headers: Vec<String> = sheet.row(0).iter().map(|c| c.as_text()).collect();
        let columns = mapping.resolve(&sheet.name, &headers)?;

        let mut records = Vec::new();
        for row in 1..sheet.row_count() {
            if sheet.is_blank_row(row) {
                continue;
            }

            let os_code = self.cleaner.clean_text(sheet.cell(row, columns.os_code));
            if os_code.is_empty() {
                continue;
            }

            let trip_cells = columns
                .trips
                .iter()
                .filter_map(|(col, ordinal)| {
                    let cell = sheet.cell(row, *col);
                    if matches!(cell, CellValue::Empty) {
                        None
                    } else {
                        Some((*ordinal, cell.as_text().trim().to_string()))
                    }
                })
                .collect();

            records.push(SecondaryRecord {
                os_code,
                flow_rate: self.cleaner.parse_decimal_opt(sheet.cell(row, columns.flow_rate)),
                tank_capacity: self
                    .cleaner
                    .parse_decimal_opt(sheet.cell(row, columns.tank_capacity)),
                trip_cells,
            });
        }

        Ok(records)
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_trip_ordinal_variants() {
        let mapping = SecondarySheetMapping::default();
        assert_eq!(mapping.trip_ordinal("1º Carga"), Some(1));
        assert_eq!(mapping.trip_ordinal("2ª carga"), Some(2));
        assert_eq!(mapping.trip_ordinal("3o carga"), Some(3));
        assert_eq!(mapping.trip_ordinal("10 CARGA"), Some(10));
        assert_eq!(mapping.trip_ordinal("2nd load"), Some(2));
        assert_eq!(mapping.trip_ordinal("Carga total"), None);
        assert_eq!(mapping.trip_ordinal("OS 308710"), None);
    }

    #[test]
    fn test_resolve_roles() {
        let mapping = SecondarySheetMapping::default();
        let columns = mapping
            .resolve(
                "Planilha2",
                &headers(&["Propriedade OS", "Ordem", "Vazão (L/ha)", "Cap. Tanque", "1º carga", "2º carga"]),
            )
            .unwrap();

        assert_eq!(columns.os_code, 1);
        assert_eq!(columns.flow_rate, 2);
        assert_eq!(columns.tank_capacity, 3);
        assert_eq!(columns.trips, vec![(4, 1), (5, 2)]);
    }

    #[test]
    fn test_resolve_prefers_whole_word_os() {
        let mapping = SecondarySheetMapping::default();
        let columns = mapping
            .resolve("P2", &headers(&["Vazão dos bicos", "OS", "Tanque"]))
            .unwrap();
        assert_eq!(columns.os_code, 1);
        assert_eq!(columns.flow_rate, 0);
        assert_eq!(columns.tank_capacity, 2);
    }

    #[test]
    fn test_resolve_missing_capacity_fails() {
        let mapping = SecondarySheetMapping::default();
        let err = mapping
            .resolve("P2", &headers(&["OS", "Vazao", "1º carga"]))
            .unwrap_err();
        match err {
            ImportError::MissingColumn { role, sheet, .. } => {
                assert_eq!(role, "capacidade do tanque");
                assert_eq!(sheet, "P2");
            }
            other => panic!("erro inesperado: {other}"),
        }
    }

    #[test]
    fn test_map_primary_row_requires_op_and_os() {
        let mapper = FieldMapper::new();
        let mut full = vec![""; 19];
        full[0] = "10";
        full[2] = "308710";
        full[3] = "R1";
        full[11] = "12,5";
        full[16] = "46024";
        full[17] = "4,5";
        full[18] = " Aberta ";
        let mut no_os = full.clone();
        no_os[2] = "";

        let sheet = SheetGrid::from_text_rows("P1", &[full, no_os]);
        let row = mapper.map_primary_row(&sheet, 0).unwrap();
        assert_eq!(row.os_code, "308710");
        assert_eq!(row.production_area, 12.5);
        assert_eq!(row.issue_date, "02/01/2026");
        assert_eq!(row.os_age, "4");
        assert_eq!(row.os_situation, "Aberta");
        assert!(mapper.map_primary_row(&sheet, 1).is_none());
    }

    #[test]
    fn test_map_secondary_sheet_skips_empty_cells() {
        let mapper = FieldMapper::new();
        let sheet = SheetGrid::from_text_rows(
            "P2",
            &[
                vec!["OS", "Vazão", "Capacidade", "1º carga", "2º carga"],
                vec!["308710", "80", "5000", "ENTREGUE", ""],
                vec!["", "", "", "", ""],
                vec!["308711", "-", "6000", "-", "pendente"],
            ],
        );
        let records = mapper
            .map_secondary_sheet(&sheet, &SecondarySheetMapping::default())
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].flow_rate, Some(80.0));
        assert_eq!(records[0].trip_cells, vec![(1, "ENTREGUE".to_string())]);
        assert_eq!(records[1].flow_rate, None);
        assert_eq!(
            records[1].trip_cells,
            vec![(1, "-".to_string()), (2, "pendente".to_string())]
        );
    }
}
