// ==========================================
// SMART CALDA - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls/.ods) / CSV (.csv)
// 输出: Workbook（每张表为 A1 对齐的单元格网格）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::operation_importer_trait::FileParser;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

static EMPTY_CELL: CellValue = CellValue::Empty;

// ==========================================
// CellValue - 单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// 文本表示（整数不带小数位，与表格显示一致）
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
        }
    }

    /// 空单元格或纯空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            // 日期保留序列值，由清洗器格式化
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

/// 列字母转 0 起始列号（"A" → 0, "Q" → 16, "AA" → 26）
pub fn column_index(letters: &str) -> usize {
    letters
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
        .saturating_sub(1)
}

// ==========================================
// SheetGrid - 工作表网格
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    rows: Vec<Vec<CellValue>>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// 由文本行构造（空串视为空单元格），测试与 CSV 共用
    pub fn from_text_rows<S: AsRef<str>>(name: impl Into<String>, rows: &[Vec<S>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        let cell = cell.as_ref();
                        if cell.trim().is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(cell.to_string())
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(name, rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// 行是否全部为空
    pub fn is_blank_row(&self, row: usize) -> bool {
        self.row(row).iter().all(CellValue::is_blank)
    }
}

// ==========================================
// Workbook - 工作簿
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<SheetGrid>,
}

impl Workbook {
    pub fn new(sheets: Vec<SheetGrid>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, index: usize) -> Option<&SheetGrid> {
        self.sheets.get(index)
    }

    /// 按名称查找（忽略大小写与重音）
    pub fn sheet_by_name(&self, names: &[&str]) -> Option<&SheetGrid> {
        let wanted: Vec<String> = names.iter().map(|n| crate::domain::types::normalize_text(n)).collect();
        self.sheets
            .iter()
            .find(|s| wanted.contains(&crate::domain::types::normalize_text(&s.name)))
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

fn grid_from_range(name: &str, range: &Range<Data>) -> SheetGrid {
    // calamine 的 Range 从首个非空单元格开始，这里补齐到 A1
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];

    for data_row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(data_row.iter().map(CellValue::from));
        rows.push(cells);
    }

    SheetGrid::new(name, rows)
}

fn read_all_sheets<RS: Read + Seek>(sheets: &mut Sheets<RS>) -> ImportResult<Workbook> {
    let names = sheets.sheet_names();
    if names.is_empty() {
        return Err(ImportError::ExcelParseError(
            "a planilha não possui abas".to_string(),
        ));
    }

    let mut grids = Vec::with_capacity(names.len());
    for name in names {
        let range = sheets.worksheet_range(&name)?;
        grids.push(grid_from_range(&name, &range));
    }

    Ok(Workbook::new(grids))
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 解析内存中的工作簿（远程下载结果）
    pub fn parse_bytes(&self, bytes: Vec<u8>) -> ImportResult<Workbook> {
        let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        read_all_sheets(&mut sheets)
    }
}

impl FileParser for ExcelParser {
    fn parse_workbook(&self, file_path: &Path) -> ImportResult<Workbook> {
        // 检查文件存在
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        // 检查扩展名
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !matches!(ext.as_str(), "xlsx" | "xlsm" | "xls" | "ods") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut sheets = open_workbook_auto(file_path)?;
        read_all_sheets(&mut sheets)
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
// CSV 视为单表工作簿，不区分表头（主表按列字母读取）
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_workbook(&self, file_path: &Path) -> ImportResult<Workbook> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells = record
                .iter()
                .map(|value| {
                    let trimmed = value.trim();
                    if trimmed.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(trimmed.to_string())
                    }
                })
                .collect();
            rows.push(cells);
        }

        let name = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string();
        Ok(Workbook::new(vec![SheetGrid::new(name, rows)]))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Workbook> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_workbook(path),
            "xlsx" | "xlsm" | "xls" | "ods" => ExcelParser.parse_workbook(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
