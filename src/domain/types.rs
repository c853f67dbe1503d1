// ==========================================
// 店铺营收分级引擎 - 领域类型定义
// ==========================================
// 职责: 颜色分级 / 店铺状态 / 报表月份
// 红线: 分级是"等级制"，不是评分制
// ==========================================

use crate::i18n;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 颜色分级 (Color Category)
// ==========================================
// 顺序: NoColor < Purple < Red < Yellow < Green
// 序列化格式: 与前端约定的小写代码 (green / yellow / red / purple / no-color)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColorCategory {
    #[serde(rename = "no-color")]
    NoColor, // 无法分级（无营收或未设目标）
    #[serde(rename = "purple")]
    Purple, // 低于可行目标的 80%
    #[serde(rename = "red")]
    Red, // 可行目标 80% ~ 100%
    #[serde(rename = "yellow")]
    Yellow, // 达成可行目标
    #[serde(rename = "green")]
    Green, // 超过突破目标
}

impl ColorCategory {
    /// 全部分级（展示顺序：由高到低）
    pub const ALL: [ColorCategory; 5] = [
        ColorCategory::Green,
        ColorCategory::Yellow,
        ColorCategory::Red,
        ColorCategory::Purple,
        ColorCategory::NoColor,
    ];

    /// 稳定代码（与 serde 一致）
    pub fn code(&self) -> &'static str {
        match self {
            ColorCategory::Green => "green",
            ColorCategory::Yellow => "yellow",
            ColorCategory::Red => "red",
            ColorCategory::Purple => "purple",
            ColorCategory::NoColor => "no-color",
        }
    }

    /// 是否为有效分级（非 no-color）
    pub fn is_classified(&self) -> bool {
        !matches!(self, ColorCategory::NoColor)
    }

    /// 当前语言下的展示名
    pub fn label(&self) -> String {
        i18n::t(&format!("category.{}", self.code()))
    }
}

impl fmt::Display for ColorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ColorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "green" => Ok(ColorCategory::Green),
            "yellow" => Ok(ColorCategory::Yellow),
            "red" => Ok(ColorCategory::Red),
            "purple" => Ok(ColorCategory::Purple),
            "no-color" | "no_color" | "none" | "" => Ok(ColorCategory::NoColor),
            other => Err(format!("未知颜色分级: {}", other)),
        }
    }
}

// ==========================================
// 店铺状态 (Shop Status)
// ==========================================
// 序列化格式: 业务系统中存储的越南语原文
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShopStatus {
    #[serde(rename = "Đang Vận Hành")]
    Operating, // 运营中
    #[serde(rename = "Shop mới")]
    New, // 新店
    #[serde(rename = "Đã Dừng")]
    Stopped, // 已停止
}

impl ShopStatus {
    pub const ALL: [ShopStatus; 3] = [ShopStatus::Operating, ShopStatus::New, ShopStatus::Stopped];

    /// 存储原文
    pub fn as_stored(&self) -> &'static str {
        match self {
            ShopStatus::Operating => "Đang Vận Hành",
            ShopStatus::New => "Shop mới",
            ShopStatus::Stopped => "Đã Dừng",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ShopStatus::Operating => "operating",
            ShopStatus::New => "new",
            ShopStatus::Stopped => "stopped",
        }
    }

    /// 宽松解析（TRIM + 大小写不敏感；兼容英文代码）
    ///
    /// 未知值返回 None（视为未设置状态）
    pub fn parse_lenient(value: &str) -> Option<ShopStatus> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        ShopStatus::ALL.into_iter().find(|status| {
            status.as_stored().to_lowercase() == normalized || status.code() == normalized
        })
    }

    pub fn label(&self) -> String {
        i18n::t(&format!("status.{}", self.code()))
    }
}

impl fmt::Display for ShopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

// ==========================================
// 报表月份 (Report Period)
// ==========================================
// 存储/序列化格式: YYYY-MM
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportPeriod {
    year: i32,
    month: u32,
}

impl ReportPeriod {
    /// 创建月份（month 取值 1..=12）
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// 日期所在月份
    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// 月初
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// 月末
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// 下一个月
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// 日期是否落在本月
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    /// 支持: YYYY-MM / YYYY-MM-DD / MM/YYYY
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let invalid = || format!("月份格式错误: {}（期望 YYYY-MM）", value);

        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(Self::of_date(date));
        }

        let (year, month) = if let Some((left, right)) = value.split_once('-') {
            (left, right)
        } else if let Some((left, right)) = value.split_once('/') {
            (right, left)
        } else {
            return Err(invalid());
        };

        let year: i32 = year.trim().parse().map_err(|_| invalid())?;
        let month: u32 = month.trim().parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for ReportPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ReportPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_category_order() {
        assert!(ColorCategory::Green > ColorCategory::Yellow);
        assert!(ColorCategory::Yellow > ColorCategory::Red);
        assert!(ColorCategory::Red > ColorCategory::Purple);
        assert!(ColorCategory::Purple > ColorCategory::NoColor);
    }

    #[test]
    fn test_color_category_serde_codes() {
        let json = serde_json::to_string(&ColorCategory::NoColor).unwrap();
        assert_eq!(json, "\"no-color\"");
        let parsed: ColorCategory = serde_json::from_str("\"green\"").unwrap();
        assert_eq!(parsed, ColorCategory::Green);
        assert_eq!("Purple".parse::<ColorCategory>().unwrap(), ColorCategory::Purple);
    }

    #[test]
    fn test_shop_status_parse_lenient() {
        assert_eq!(ShopStatus::parse_lenient("  Đang Vận Hành "), Some(ShopStatus::Operating));
        assert_eq!(ShopStatus::parse_lenient("shop mới"), Some(ShopStatus::New));
        assert_eq!(ShopStatus::parse_lenient("stopped"), Some(ShopStatus::Stopped));
        assert_eq!(ShopStatus::parse_lenient("tạm nghỉ"), None);
        assert_eq!(ShopStatus::parse_lenient(""), None);
    }

    #[test]
    fn test_report_period_parse_and_display() {
        let p: ReportPeriod = "2025-09".parse().unwrap();
        assert_eq!(p.to_string(), "2025-09");
        assert_eq!("09/2025".parse::<ReportPeriod>().unwrap(), p);
        assert_eq!("2025-09-17".parse::<ReportPeriod>().unwrap(), p);
        assert!("2025-13".parse::<ReportPeriod>().is_err());
        assert!("abc".parse::<ReportPeriod>().is_err());
    }

    #[test]
    fn test_report_period_bounds() {
        let feb = ReportPeriod::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let dec = ReportPeriod::new(2025, 12).unwrap();
        assert_eq!(dec.next(), ReportPeriod::new(2026, 1).unwrap());
        assert!(dec.contains(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
        assert!(!dec.contains(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }

    #[test]
    fn test_report_period_serde_as_string() {
        let p = ReportPeriod::new(2025, 9).unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"2025-09\"");
        let back: ReportPeriod = serde_json::from_str("\"2025-09\"").unwrap();
        assert_eq!(back, p);
    }
}
