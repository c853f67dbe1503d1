// ==========================================
// 店铺营收分级引擎 - 上传行与综合报表
// ==========================================
// 边界: UploadRow（未解析）→ NormalizedReportRow（已规范化）
// 职责: 原始单元格 / 报表指标 / 诊断信息 / 导入批次
// ==========================================

use crate::domain::revenue::RevenueComponents;
use crate::domain::types::ReportPeriod;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// RawCell - 原始单元格
// ==========================================
// 上传行的单元格只可能是数字或文本；其他 JSON 形态标记为 Unsupported
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Number(f64),
    Text(String),
    Empty,
    Unsupported(String), // 原始 JSON 文本（bool / array / object）
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 诊断用的原始值文本
    pub fn raw_text(&self) -> String {
        match self {
            RawCell::Number(n) => n.to_string(),
            RawCell::Text(s) => s.clone(),
            RawCell::Empty => String::new(),
            RawCell::Unsupported(s) => s.clone(),
        }
    }
}

impl From<serde_json::Value> for RawCell {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawCell::Empty,
            serde_json::Value::Number(n) => n.as_f64().map(RawCell::Number).unwrap_or(RawCell::Empty),
            serde_json::Value::String(s) => RawCell::Text(s),
            other => RawCell::Unsupported(other.to_string()),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.to_string())
    }
}

impl From<String> for RawCell {
    fn from(value: String) -> Self {
        RawCell::Text(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Number(value)
    }
}

impl From<i64> for RawCell {
    fn from(value: i64) -> Self {
        RawCell::Number(value as f64)
    }
}

// ==========================================
// UploadRow - 上传原始行
// ==========================================
// 列名（本地化标签）→ 原始单元格；row_number 从 1 开始（不含表头）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadRow {
    pub row_number: usize,
    pub cells: HashMap<String, RawCell>,
}

impl UploadRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: HashMap::new(),
        }
    }

    /// 链式写入单元格（测试与嵌入方便用）
    pub fn with(mut self, label: &str, cell: impl Into<RawCell>) -> Self {
        self.cells.insert(label.to_string(), cell.into());
        self
    }

    /// 从 JSON 对象构造（前端直接提交的行）
    pub fn from_json_object(row_number: usize, object: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            row_number,
            cells: object
                .into_iter()
                .map(|(label, value)| (label.trim().to_string(), RawCell::from(value)))
                .collect(),
        }
    }

    pub fn get(&self, label: &str) -> Option<&RawCell> {
        self.cells.get(label)
    }

    /// 是否整行为空
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(RawCell::is_empty)
    }
}

// ==========================================
// ReportMetrics - 综合报表指标
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    // 金额（最小货币单位）
    pub total_revenue: i64,
    pub cancelled_revenue: i64,
    pub returned_revenue: i64,
    pub platform_subsidized_revenue: i64,
    pub ad_spend: i64,
    pub average_order_value: i64,

    // 计数
    pub total_orders: i64,
    pub cancelled_orders: i64,
    pub returned_orders: i64,
    pub visits: i64,
    pub buyers: i64,

    // 比率（百分数，6% 记为 6.0）
    pub conversion_rate: f64,
    pub cancellation_rate: f64,
    pub return_rate: f64,
    pub roas: f64,
}

impl ReportMetrics {
    /// 聚合器所需的营收构成
    pub fn revenue_components(&self) -> RevenueComponents {
        RevenueComponents {
            total_revenue: self.total_revenue,
            cancelled_revenue: self.cancelled_revenue,
            returned_revenue: self.returned_revenue,
            // 无补贴（0）统一记为 None，与直接写入的月度营收一致
            platform_subsidized_revenue: (self.platform_subsidized_revenue > 0)
                .then_some(self.platform_subsidized_revenue),
        }
    }

    /// 累加金额与计数（比率字段不累加）
    ///
    /// 金额逐项截断到 >= 0 后再相加
    pub fn add_amounts(&mut self, other: &ReportMetrics) {
        fn add(acc: i64, value: i64) -> i64 {
            acc.max(0).saturating_add(value.max(0))
        }

        self.total_revenue = add(self.total_revenue, other.total_revenue);
        self.cancelled_revenue = add(self.cancelled_revenue, other.cancelled_revenue);
        self.returned_revenue = add(self.returned_revenue, other.returned_revenue);
        self.platform_subsidized_revenue =
            add(self.platform_subsidized_revenue, other.platform_subsidized_revenue);
        self.ad_spend = add(self.ad_spend, other.ad_spend);
        self.total_orders = self.total_orders.saturating_add(other.total_orders);
        self.cancelled_orders = self.cancelled_orders.saturating_add(other.cancelled_orders);
        self.returned_orders = self.returned_orders.saturating_add(other.returned_orders);
        self.visits = self.visits.saturating_add(other.visits);
        self.buyers = self.buyers.saturating_add(other.buyers);
    }

    /// 由汇总后的金额/计数重算比率字段
    ///
    /// 分母为 0（上传中没有对应列）时不重算，改用各行上报值的平均值，
    /// 避免把上报的比率覆盖为 0
    pub fn recompute_rates(&mut self, reported: &[ReportMetrics]) {
        let mean = |pick: fn(&ReportMetrics) -> f64| -> f64 {
            if reported.is_empty() {
                0.0
            } else {
                reported.iter().map(pick).sum::<f64>() / reported.len() as f64
            }
        };
        let percent = |numerator: i64, denominator: i64, pick: fn(&ReportMetrics) -> f64| -> f64 {
            if denominator == 0 {
                mean(pick)
            } else {
                numerator as f64 * 100.0 / denominator as f64
            }
        };

        self.conversion_rate = percent(self.buyers, self.visits, |m| m.conversion_rate);
        self.cancellation_rate = percent(self.cancelled_orders, self.total_orders, |m| m.cancellation_rate);
        self.return_rate = percent(self.returned_orders, self.total_orders, |m| m.return_rate);
        self.average_order_value = if self.total_orders == 0 {
            mean(|m| m.average_order_value as f64).round() as i64
        } else {
            (self.total_revenue as f64 / self.total_orders as f64).round() as i64
        };
        self.roas = if self.ad_spend == 0 {
            mean(|m| m.roas)
        } else {
            self.total_revenue as f64 / self.ad_spend as f64
        };
    }
}

// ==========================================
// NormalizedReportRow - 规范化后的报表行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReportRow {
    pub row_number: usize,
    pub shop_id: Option<String>,
    pub shop_name: Option<String>,
    pub revenue_date: Option<NaiveDate>,
    pub metrics: ReportMetrics,
}

// ==========================================
// ComprehensiveReport - 店铺月度综合报表
// ==========================================
// 唯一键: (shop_id, period)，重传覆盖
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    pub shop_id: String,
    pub shop_name: Option<String>,
    pub period: ReportPeriod,
    pub metrics: ReportMetrics,
    pub source_rows: usize,              // 参与汇总的上传行数
    pub source_batch_id: Option<String>, // 来源导入批次
}

// ==========================================
// DiagnosticLevel - 诊断级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticLevel {
    Error,   // 行被跳过
    Warning, // 值被替换为 0 / 行被排除
    Info,    // 仅记录
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "ERROR"),
            DiagnosticLevel::Warning => write!(f, "WARNING"),
            DiagnosticLevel::Info => write!(f, "INFO"),
        }
    }
}

// ==========================================
// ImportDiagnostic - 导入诊断
// ==========================================
// 用途: 让"格式错误被当作 0"的数据可被发现，而不阻断导入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDiagnostic {
    pub row_number: usize,      // 原始行号
    pub column: Option<String>, // 列标签（整行问题为空）
    pub raw_value: String,      // 原始值
    pub level: DiagnosticLevel,
    pub message: String,
}

// ==========================================
// ImportBatch - 导入批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub period: ReportPeriod,
    pub file_name: Option<String>,
    pub total_rows: usize,     // 上传行数（不含空行）
    pub imported_shops: usize, // 覆盖写入的店铺数
    pub skipped_rows: usize,   // 被跳过的行数
    pub warning_count: usize,  // WARNING 级诊断数
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

// ==========================================
// ImportOutcome - 导入结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub batch: ImportBatch,
    pub revenues: Vec<crate::domain::revenue::ShopPeriodRevenue>,
    pub reports: Vec<ComprehensiveReport>,
    pub diagnostics: Vec<ImportDiagnostic>,
    pub diagnostics_truncated: bool, // 诊断条数超过上限后被截断
}
