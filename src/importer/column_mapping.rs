// ==========================================
// 店铺营收分级引擎 - 列映射表
// ==========================================
// 职责: 本地化列标签 → (字段, 值类型)
// 来源: 平台导出的越南语综合报表表头
// ==========================================
// 红线: 映射表在加载时一次性校验（空标签 / 重复标签 / 类型冲突）
// 红线: 标签比较忽略首尾空白、大小写与连续空白
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// ValueKind - 列值类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Number,
    Percentage,
    Integer,
    Text,
    Date,
}

// ==========================================
// ReportField - 报表字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportField {
    ShopId,
    ShopName,
    RevenueDate,
    TotalRevenue,
    CancelledRevenue,
    ReturnedRevenue,
    PlatformSubsidizedRevenue,
    AdSpend,
    AverageOrderValue,
    TotalOrders,
    CancelledOrders,
    ReturnedOrders,
    Visits,
    Buyers,
    ConversionRate,
    CancellationRate,
    ReturnRate,
    Roas,
}

impl ReportField {
    /// 字段固有的值类型
    pub fn kind(&self) -> ValueKind {
        use ReportField::*;
        match self {
            ShopId | ShopName => ValueKind::Text,
            RevenueDate => ValueKind::Date,
            TotalRevenue | CancelledRevenue | ReturnedRevenue | PlatformSubsidizedRevenue
            | AdSpend | AverageOrderValue | Roas => ValueKind::Number,
            TotalOrders | CancelledOrders | ReturnedOrders | Visits | Buyers => ValueKind::Integer,
            ConversionRate | CancellationRate | ReturnRate => ValueKind::Percentage,
        }
    }

    /// 金额字段（负值会产生 INFO 诊断）
    pub fn is_amount(&self) -> bool {
        use ReportField::*;
        matches!(
            self,
            TotalRevenue | CancelledRevenue | ReturnedRevenue | PlatformSubsidizedRevenue | AdSpend
        )
    }
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde 名称即 snake_case 字段名
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        write!(f, "{}", name)
    }
}

/// 标准综合报表表头
pub const STANDARD_COLUMNS: &[(&str, ReportField)] = &[
    ("Mã Shop", ReportField::ShopId),
    ("Tên Shop", ReportField::ShopName),
    ("Ngày", ReportField::RevenueDate),
    ("Tổng giá trị hàng hóa (₫)", ReportField::TotalRevenue),
    ("Doanh số đơn hủy (₫)", ReportField::CancelledRevenue),
    ("Doanh số đơn hoàn trả (₫)", ReportField::ReturnedRevenue),
    ("Doanh số được trợ giá bởi nền tảng (₫)", ReportField::PlatformSubsidizedRevenue),
    ("Chi phí quảng cáo (₫)", ReportField::AdSpend),
    ("Giá trị đơn hàng trung bình (₫)", ReportField::AverageOrderValue),
    ("Tổng số đơn hàng", ReportField::TotalOrders),
    ("Số đơn hủy", ReportField::CancelledOrders),
    ("Số đơn hoàn trả", ReportField::ReturnedOrders),
    ("Lượt truy cập", ReportField::Visits),
    ("Số người mua", ReportField::Buyers),
    ("Tỷ lệ chuyển đổi", ReportField::ConversionRate),
    ("Tỷ lệ hủy đơn", ReportField::CancellationRate),
    ("Tỷ lệ hoàn trả", ReportField::ReturnRate),
    ("ROAS", ReportField::Roas),
];

/// 常见的表头变体
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("ID Shop", "Mã Shop"),
    ("Shop ID", "Mã Shop"),
    ("Doanh số (₫)", "Tổng giá trị hàng hóa (₫)"),
    ("Số lượt truy cập", "Lượt truy cập"),
];

// ==========================================
// ColumnSpec - 单列映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub label: String,
    pub field: ReportField,
    pub kind: ValueKind,
}

impl ColumnSpec {
    pub fn new(label: &str, field: ReportField) -> Self {
        Self {
            label: label.to_string(),
            field,
            kind: field.kind(),
        }
    }
}

/// 标签归一化（首尾空白 / 大小写 / 连续空白）
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ==========================================
// ColumnMap - 已校验的映射表
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnMap {
    specs: Vec<ColumnSpec>,          // 声明顺序（标准列在前，别名在后）
    index: HashMap<String, usize>,   // 归一化标签 → specs 下标
}

impl ColumnMap {
    /// 标准映射表（含内置别名）
    pub fn standard() -> ImportResult<Self> {
        let mut specs: Vec<ColumnSpec> = STANDARD_COLUMNS
            .iter()
            .map(|(label, field)| ColumnSpec::new(label, *field))
            .collect();
        for (alias, canonical) in BUILTIN_ALIASES {
            let field = STANDARD_COLUMNS
                .iter()
                .find(|(label, _)| label == canonical)
                .map(|(_, field)| *field)
                .ok_or_else(|| {
                    ImportError::MappingTable(format!("内置别名 {} 指向未知列 {}", alias, canonical))
                })?;
            specs.push(ColumnSpec::new(alias, field));
        }
        Self::from_specs(specs)
    }

    /// 由任意列定义构造并校验
    pub fn from_specs(specs: Vec<ColumnSpec>) -> ImportResult<Self> {
        let mut index = HashMap::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            let key = normalize_label(&spec.label);
            if key.is_empty() {
                return Err(ImportError::MappingTable(format!(
                    "字段 {} 的列标签为空",
                    spec.field
                )));
            }
            if spec.kind != spec.field.kind() {
                return Err(ImportError::MappingTable(format!(
                    "列 '{}' 声明类型 {:?} 与字段 {} 的类型 {:?} 冲突",
                    spec.label,
                    spec.kind,
                    spec.field,
                    spec.field.kind()
                )));
            }
            if let Some(prev) = index.insert(key, idx) {
                return Err(ImportError::MappingTable(format!(
                    "列标签重复: '{}' 与 '{}'",
                    specs[prev].label, spec.label
                )));
            }
        }
        Ok(Self { specs, index })
    }

    /// 追加配置中的别名（别名标签 → 已存在的列标签）
    pub fn with_aliases(self, aliases: &HashMap<String, String>) -> ImportResult<Self> {
        if aliases.is_empty() {
            return Ok(self);
        }
        let mut specs = self.specs;
        // 按别名排序，保证追加顺序确定
        let mut pairs: Vec<(&String, &String)> = aliases.iter().collect();
        pairs.sort();
        for (alias, target) in pairs {
            let target_key = normalize_label(target);
            let field = specs
                .iter()
                .find(|s| normalize_label(&s.label) == target_key)
                .map(|s| s.field)
                .ok_or_else(|| {
                    ImportError::MappingTable(format!("别名 '{}' 指向未知列 '{}'", alias, target))
                })?;
            specs.push(ColumnSpec::new(alias, field));
        }
        Self::from_specs(specs)
    }

    pub fn resolve(&self, label: &str) -> Option<&ColumnSpec> {
        self.index
            .get(&normalize_label(label))
            .and_then(|idx| self.specs.get(*idx))
    }

    /// 按声明顺序遍历
    pub fn specs(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
