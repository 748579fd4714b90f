// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、应用状态、工作簿构造
// ==========================================

#![allow(dead_code)]

use smart_calda::app::AppState;
use smart_calda::db::{init_schema, open_sqlite_connection};
use smart_calda::importer::{SheetGrid, Workbook};
use std::error::Error;
use tempfile::NamedTempFile;

/// 主表样例（两行表头 + 三行数据，含一行空行）
pub const PRIMARY_CSV_FIXTURE: &str = "tests/fixtures/atlos_primary.csv";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 基于临时数据库创建 AppState
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    (temp_file, state)
}

pub fn text_row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

/// 主表数据行（列 A..S）
pub fn primary_row(
    operation: &str,
    os_code: &str,
    resource_id: &str,
    supervisor_id: &str,
    location_id: &str,
    area: &str,
) -> Vec<String> {
    let mut row = vec![String::new(); 19];
    row[0] = operation.to_string();
    row[1] = format!("Operação {}", operation);
    row[2] = os_code.to_string();
    row[3] = resource_id.to_string();
    row[4] = format!("Produto {}", resource_id);
    row[5] = "F1".to_string();
    row[6] = "Fazenda Boa Vista".to_string();
    row[7] = location_id.to_string();
    row[8] = format!("Setor {}", location_id);
    row[9] = supervisor_id.to_string();
    row[10] = format!("Encarregado {}", supervisor_id);
    row[11] = area.to_string();
    row
}

/// 三张表的工作簿：主表 / 副表（罐容、流量、车次状态）/ 司机表
pub fn sample_workbook() -> Workbook {
    let primary = SheetGrid::from_text_rows(
        "ATLOS",
        &[
            text_row(&["RELATÓRIO"]),
            text_row(&["Operação", "Descrição", "O.S."]),
            primary_row("10", "308710", "R1", "77", "S1", "100"),
            primary_row("10", "308710", "R2", "77", "S1", "100"),
            primary_row("20", "308900", "R3", "78", "S2", "40"),
            primary_row("30", "309000", "R4", "", "S3", "10"),
        ],
    );
    let secondary = SheetGrid::from_text_rows(
        "Dados",
        &[
            text_row(&[
                "Ordem de Serviço",
                "Vazão (L/ha)",
                "Capacidade Tanque",
                "1ª carga",
                "2ª carga",
                "3ª carga",
            ]),
            text_row(&["308710", "100", "5000", "ENTREGUE", "ENTREGUE", "pendente"]),
            text_row(&["308900", "50", "1000", "ok", "", ""]),
        ],
    );
    let drivers = SheetGrid::from_text_rows(
        "Motoristas",
        &[
            text_row(&["Nome", "Turno"]),
            text_row(&["José Carlos", "Turno B"]),
            text_row(&["Ana", ""]),
        ],
    );
    Workbook::new(vec![primary, secondary, drivers])
}
