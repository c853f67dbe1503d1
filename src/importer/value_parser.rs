// ==========================================
// 店铺营收分级引擎 - 单元格数值解析
// ==========================================
// 职责: 本地化格式的数字 / 百分比 / 整数 / 日期 → 强类型
// ==========================================
// 契约（宽松策略）:
// - parse_number / parse_percentage / parse_integer 永不失败，永不产出 NaN
// - 无法解析的输入一律返回 0
// - *_checked 变体返回失败原因，供规范化器记录诊断
// - 空单元格 / 缺失列视为合法的 0（不产生诊断）
// ==========================================

use crate::domain::report::RawCell;
use chrono::{Duration, NaiveDate};
use std::fmt;

// ==========================================
// CellParseIssue - 单元格解析问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellParseIssue {
    /// 文本无法解析为目标类型
    Unparseable(String),
    /// 单元格类型不支持（bool / 对象 / 数组 / 错误值）
    UnsupportedType(String),
    /// 解析结果为 NaN / 无穷
    NonFinite(String),
}

impl CellParseIssue {
    /// i18n 消息键
    pub fn message_key(&self) -> &'static str {
        match self {
            CellParseIssue::Unparseable(_) => "diagnostic.unparseable",
            CellParseIssue::UnsupportedType(_) => "diagnostic.unsupported_type",
            CellParseIssue::NonFinite(_) => "diagnostic.non_finite",
        }
    }

    pub fn raw_value(&self) -> &str {
        match self {
            CellParseIssue::Unparseable(v)
            | CellParseIssue::UnsupportedType(v)
            | CellParseIssue::NonFinite(v) => v,
        }
    }
}

impl fmt::Display for CellParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellParseIssue::Unparseable(v) => write!(f, "无法解析: {}", v),
            CellParseIssue::UnsupportedType(v) => write!(f, "类型不支持: {}", v),
            CellParseIssue::NonFinite(v) => write!(f, "非有限数值: {}", v),
        }
    }
}

/// 去掉千分位、空白（含不换行空格）与货币符号
fn strip_grouping(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ',' | '₫' | '\u{a0}') && !c.is_whitespace())
        .collect()
}

fn finite(value: f64, raw: &str) -> Result<f64, CellParseIssue> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CellParseIssue::NonFinite(raw.to_string()))
    }
}

// ==========================================
// 数字
// ==========================================

/// 解析数字（"1,500,000" → 1500000.0）
pub fn parse_number_checked(cell: &RawCell) -> Result<f64, CellParseIssue> {
    match cell {
        RawCell::Number(n) => finite(*n, &n.to_string()),
        RawCell::Empty => Ok(0.0),
        RawCell::Unsupported(raw) => Err(CellParseIssue::UnsupportedType(raw.clone())),
        RawCell::Text(raw) => {
            let cleaned = strip_grouping(raw);
            if cleaned.is_empty() {
                return Ok(0.0);
            }
            match cleaned.parse::<f64>() {
                Ok(v) => finite(v, raw),
                Err(_) => Err(CellParseIssue::Unparseable(raw.clone())),
            }
        }
    }
}

pub fn parse_number(cell: &RawCell) -> f64 {
    parse_number_checked(cell).unwrap_or(0.0)
}

// ==========================================
// 百分比
// ==========================================

/// 解析百分比（"6%" → 6.0；"6.5 %" → 6.5）
pub fn parse_percentage_checked(cell: &RawCell) -> Result<f64, CellParseIssue> {
    match cell {
        RawCell::Text(raw) => {
            let trimmed = raw.trim();
            let without_sign = trimmed.strip_suffix('%').unwrap_or(trimmed);
            parse_number_checked(&RawCell::Text(without_sign.to_string())).map_err(|issue| match issue {
                CellParseIssue::Unparseable(_) => CellParseIssue::Unparseable(raw.clone()),
                CellParseIssue::NonFinite(_) => CellParseIssue::NonFinite(raw.clone()),
                other => other,
            })
        }
        other => parse_number_checked(other),
    }
}

pub fn parse_percentage(cell: &RawCell) -> f64 {
    parse_percentage_checked(cell).unwrap_or(0.0)
}

// ==========================================
// 整数
// ==========================================

/// 解析整数（十进制；小数向零截断："12.7" → 12）
pub fn parse_integer_checked(cell: &RawCell) -> Result<i64, CellParseIssue> {
    match cell {
        RawCell::Text(raw) => {
            let cleaned = strip_grouping(raw);
            if cleaned.is_empty() {
                return Ok(0);
            }
            if let Ok(v) = cleaned.parse::<i64>() {
                return Ok(v);
            }
            match cleaned.parse::<f64>() {
                Ok(v) => finite(v, raw).map(|v| v.trunc() as i64),
                Err(_) => Err(CellParseIssue::Unparseable(raw.clone())),
            }
        }
        other => parse_number_checked(other).map(|v| v.trunc() as i64),
    }
}

pub fn parse_integer(cell: &RawCell) -> i64 {
    parse_integer_checked(cell).unwrap_or(0)
}

// ==========================================
// 日期
// ==========================================

/// Excel 序列日期的合法范围（1900-01-01 ~ 9999-12-31）
const EXCEL_SERIAL_RANGE: std::ops::RangeInclusive<f64> = 1.0..=2_958_465.0;

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !EXCEL_SERIAL_RANGE.contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// 解析日期
///
/// 支持: YYYY-MM-DD / DD/MM/YYYY / YYYY/MM/DD / YYYYMMDD / Excel 序列日期；
/// 带时间部分的文本只取日期部分
pub fn parse_date_checked(cell: &RawCell) -> Result<Option<NaiveDate>, CellParseIssue> {
    match cell {
        RawCell::Empty => Ok(None),
        RawCell::Unsupported(raw) => Err(CellParseIssue::UnsupportedType(raw.clone())),
        RawCell::Number(n) => excel_serial_to_date(*n)
            .map(Some)
            .ok_or_else(|| CellParseIssue::Unparseable(n.to_string())),
        RawCell::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let date_part = trimmed.split_whitespace().next().unwrap_or(trimmed);
            for format in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%Y%m%d"] {
                if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
                    return Ok(Some(date));
                }
            }
            date_part
                .parse::<f64>()
                .ok()
                .and_then(excel_serial_to_date)
                .map(Some)
                .ok_or_else(|| CellParseIssue::Unparseable(raw.clone()))
        }
    }
}
