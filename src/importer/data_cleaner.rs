// ==========================================
// SMART CALDA - 数据清洗器实现
// ==========================================
// 职责: TRIM / 小数逗号归一化 / Excel 序列日期 / O.S. 天数截断
// 红线: 清洗不失败，无法解析的数值取 0，空单元格取空串
// ==========================================

use crate::importer::file_parser::CellValue;
use chrono::{DateTime, Utc};

/// Excel 1900 日期系统与 Unix 纪元的天数差
pub const EXCEL_UNIX_EPOCH_OFFSET_DAYS: f64 = 25569.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub struct DataCleaner;

impl DataCleaner {
    /// 文本单元格（去首尾空白）
    pub fn clean_text(&self, cell: &CellValue) -> String {
        cell.as_text().trim().to_string()
    }

    /// 空白视为 None
    pub fn normalize_null(&self, cell: &CellValue) -> Option<String> {
        let text = self.clean_text(cell);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// 数值解析，失败取 0
    ///
    /// "1,5" → 1.5；"12abc" → 12（取最长数值前缀）
    pub fn parse_decimal(&self, cell: &CellValue) -> f64 {
        self.parse_decimal_opt(cell).unwrap_or(0.0)
    }

    /// 数值解析，空白或无法解析时为 None
    pub fn parse_decimal_opt(&self, cell: &CellValue) -> Option<f64> {
        match cell {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(*n).filter(|v| v.is_finite()),
            CellValue::Text(s) => parse_float_prefix(&s.replacen(',', ".", 1)),
        }
    }

    /// 发布日期：Excel 序列值转 DD/MM/YYYY，已含 '/' 的文本原样保留
    pub fn format_issue_date(&self, cell: &CellValue) -> String {
        let serial = match cell {
            CellValue::Empty => return String::new(),
            CellValue::Number(n) => *n,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return String::new();
                }
                if trimmed.contains('/') {
                    return trimmed.to_string();
                }
                match parse_float_prefix(trimmed) {
                    Some(v) => v,
                    None => return trimmed.to_string(),
                }
            }
        };

        if serial == 0.0 {
            return String::new();
        }
        excel_serial_to_date(serial).unwrap_or_default()
    }

    /// O.S. 天数：逗号后的小数部分丢弃
    pub fn clean_os_age(&self, cell: &CellValue) -> String {
        let text = cell.as_text();
        match text.split_once(',') {
            Some((days, _)) => days.to_string(),
            None => text,
        }
    }
}

/// Excel 序列值 → DD/MM/YYYY（UTC）
pub fn excel_serial_to_date(serial: f64) -> Option<String> {
    let millis = ((serial - EXCEL_UNIX_EPOCH_OFFSET_DAYS) * MILLIS_PER_DAY).round();
    if !millis.is_finite() {
        return None;
    }
    let datetime: DateTime<Utc> = DateTime::from_timestamp_millis(millis as i64)?;
    Some(datetime.format("%d/%m/%Y").to_string())
}

/// 解析最长的十进制数值前缀（前导空白、可选符号、小数点、指数）
fn parse_float_prefix(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        let frac_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        mantissa_digits += end - frac_start;
    }
    if mantissa_digits == 0 {
        return None;
    }

    // 指数部分必须完整才计入
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
