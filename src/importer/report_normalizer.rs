// ==========================================
// 店铺营收分级引擎 - 报表行规范化
// ==========================================
// 职责: UploadRow → NormalizedReportRow + ImportDiagnostic
// 流程: 标签解析 → 按字段类型解析 → 异常值替换为 0 并记录诊断
// ==========================================
// 红线: 规范化永不失败，单元格问题只产生诊断
// 红线: 同一字段出现多个别名列时，按映射表声明顺序取第一个非空值
// ==========================================

use crate::domain::report::{
    DiagnosticLevel, ImportDiagnostic, NormalizedReportRow, RawCell, ReportMetrics, UploadRow,
};
use crate::i18n::t_with_args;
use crate::importer::column_mapping::{normalize_label, ColumnMap, ColumnSpec, ReportField, ValueKind};
use crate::importer::value_parser::{
    parse_date_checked, parse_integer_checked, parse_number_checked, parse_percentage_checked,
    CellParseIssue,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

pub struct ReportNormalizer {
    columns: ColumnMap,
}

/// 单字段的解析结果
enum FieldValue {
    Decimal(f64),
    Count(i64),
    Rate(f64),
    Text(Option<String>),
    Date(Option<chrono::NaiveDate>),
}

impl ReportNormalizer {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// 规范化整批行
    ///
    /// 未识别的列只在 debug 级别记录一次
    pub fn normalize_rows(&self, rows: &[UploadRow]) -> (Vec<NormalizedReportRow>, Vec<ImportDiagnostic>) {
        let mut diagnostics = Vec::new();
        let mut unknown_labels = BTreeSet::new();

        let normalized = rows
            .iter()
            .map(|row| {
                for label in row.cells.keys() {
                    if self.columns.resolve(label).is_none() {
                        unknown_labels.insert(label.clone());
                    }
                }
                self.normalize_row(row, &mut diagnostics)
            })
            .collect();

        if !unknown_labels.is_empty() {
            debug!(columns = ?unknown_labels, "存在未识别的列，已忽略");
        }
        (normalized, diagnostics)
    }

    /// 规范化单行
    pub fn normalize_row(&self, row: &UploadRow, diagnostics: &mut Vec<ImportDiagnostic>) -> NormalizedReportRow {
        // 归一化标签 → (原始标签, 单元格)
        let cells: HashMap<String, (&str, &RawCell)> = row
            .cells
            .iter()
            .map(|(label, cell)| (normalize_label(label), (label.as_str(), cell)))
            .collect();

        let mut result = NormalizedReportRow {
            row_number: row.row_number,
            shop_id: None,
            shop_name: None,
            revenue_date: None,
            metrics: ReportMetrics::default(),
        };
        let mut filled: HashSet<ReportField> = HashSet::new();

        for spec in self.columns.specs() {
            if filled.contains(&spec.field) {
                continue;
            }
            let Some((label, cell)) = cells.get(&normalize_label(&spec.label)) else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }
            filled.insert(spec.field);

            let mut value = self.parse_cell(row.row_number, label, cell, spec, diagnostics);

            // 负数调整行不参与扣减：金额截断为 0，记录 INFO 诊断
            if let FieldValue::Decimal(amount) = value {
                let rounded = amount.round() as i64;
                if spec.field.is_amount() && rounded < 0 {
                    debug!(row = row.row_number, column = label, amount = rounded, "负数金额按 0 处理");
                    diagnostics.push(ImportDiagnostic {
                        row_number: row.row_number,
                        column: Some(label.to_string()),
                        raw_value: cell.raw_text(),
                        level: DiagnosticLevel::Info,
                        message: t_with_args("diagnostic.negative_amount", &[("value", &rounded.to_string())]),
                    });
                    value = FieldValue::Decimal(0.0);
                }
            }
            apply_field(&mut result, spec.field, value);
        }

        result
    }

    fn parse_cell(
        &self,
        row_number: usize,
        label: &str,
        cell: &RawCell,
        spec: &ColumnSpec,
        diagnostics: &mut Vec<ImportDiagnostic>,
    ) -> FieldValue {
        let mut report = |issue: CellParseIssue| {
            warn!(
                row = row_number,
                column = label,
                raw = issue.raw_value(),
                "单元格无法解析，按 0 处理"
            );
            diagnostics.push(ImportDiagnostic {
                row_number,
                column: Some(label.to_string()),
                raw_value: issue.raw_value().to_string(),
                level: DiagnosticLevel::Warning,
                message: t_with_args(issue.message_key(), &[("column", label)]),
            });
        };

        match spec.kind {
            ValueKind::Number => FieldValue::Decimal(parse_number_checked(cell).unwrap_or_else(|issue| {
                report(issue);
                0.0
            })),
            ValueKind::Integer => FieldValue::Count(parse_integer_checked(cell).unwrap_or_else(|issue| {
                report(issue);
                0
            })),
            ValueKind::Percentage => FieldValue::Rate(parse_percentage_checked(cell).unwrap_or_else(|issue| {
                report(issue);
                0.0
            })),
            ValueKind::Text => FieldValue::Text(cell_text(cell)),
            ValueKind::Date => FieldValue::Date(parse_date_checked(cell).unwrap_or_else(|issue| {
                report(issue);
                None
            })),
        }
    }
}

/// 文本字段: Excel 中的纯数字店铺 ID（12345.0）去掉小数部分
fn cell_text(cell: &RawCell) -> Option<String> {
    match cell {
        RawCell::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(format!("{}", *n as i64)),
        RawCell::Number(n) => Some(n.to_string()),
        RawCell::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        RawCell::Empty => None,
        RawCell::Unsupported(s) => Some(s.clone()),
    }
}

fn apply_field(row: &mut NormalizedReportRow, field: ReportField, value: FieldValue) {
    let m = &mut row.metrics;
    match (field, value) {
        (ReportField::ShopId, FieldValue::Text(v)) => row.shop_id = v,
        (ReportField::ShopName, FieldValue::Text(v)) => row.shop_name = v,
        (ReportField::RevenueDate, FieldValue::Date(v)) => row.revenue_date = v,
        (ReportField::Roas, FieldValue::Decimal(v)) => m.roas = v,
        (field, FieldValue::Decimal(v)) => {
            let amount = v.round() as i64;
            match field {
                ReportField::TotalRevenue => m.total_revenue = amount,
                ReportField::CancelledRevenue => m.cancelled_revenue = amount,
                ReportField::ReturnedRevenue => m.returned_revenue = amount,
                ReportField::PlatformSubsidizedRevenue => m.platform_subsidized_revenue = amount,
                ReportField::AdSpend => m.ad_spend = amount,
                ReportField::AverageOrderValue => m.average_order_value = amount,
                _ => {}
            }
        }
        (ReportField::TotalOrders, FieldValue::Count(v)) => m.total_orders = v,
        (ReportField::CancelledOrders, FieldValue::Count(v)) => m.cancelled_orders = v,
        (ReportField::ReturnedOrders, FieldValue::Count(v)) => m.returned_orders = v,
        (ReportField::Visits, FieldValue::Count(v)) => m.visits = v,
        (ReportField::Buyers, FieldValue::Count(v)) => m.buyers = v,
        (ReportField::ConversionRate, FieldValue::Rate(v)) => m.conversion_rate = v,
        (ReportField::CancellationRate, FieldValue::Rate(v)) => m.cancellation_rate = v,
        (ReportField::ReturnRate, FieldValue::Rate(v)) => m.return_rate = v,
        // ColumnMap 已保证字段与类型一致
        _ => {}
    }
}
