// ==========================================
// 店铺营收分级引擎 - 上传行合并
// ==========================================
// 职责: NormalizedReportRow → 每店一条 ShopPeriodRevenue + ComprehensiveReport
// 规则:
// - 无店铺 ID 的行使用请求的默认店铺，否则跳过（ERROR 诊断）
// - 日期不在目标月份的行按配置跳过（WARNING 诊断）
// - 同一店铺多行: 金额与计数求和，比率由合计重算（缺分母时取上报均值）；单行保留原比率
// - 负数金额不冲减合计
// ==========================================

use crate::domain::report::{
    ComprehensiveReport, DiagnosticLevel, ImportDiagnostic, NormalizedReportRow, ReportMetrics,
};
use crate::domain::revenue::ShopPeriodRevenue;
use crate::domain::types::ReportPeriod;
use crate::i18n::t_with_args;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// 合并选项
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub period: ReportPeriod,
    pub default_shop_id: Option<String>,
    pub reject_out_of_period_rows: bool,
}

/// 合并结果（按 shop_id 升序）
#[derive(Debug, Clone, Default)]
pub struct MergedUpload {
    pub revenues: Vec<ShopPeriodRevenue>,
    pub reports: Vec<ComprehensiveReport>,
    pub skipped_rows: usize,
    pub diagnostics: Vec<ImportDiagnostic>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UploadMerger;

impl UploadMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, rows: Vec<NormalizedReportRow>, options: &MergeOptions) -> MergedUpload {
        let mut merged = MergedUpload::default();
        let mut groups: BTreeMap<String, Vec<NormalizedReportRow>> = BTreeMap::new();

        for row in rows {
            let shop_id = match row.shop_id.clone().or_else(|| options.default_shop_id.clone()) {
                Some(id) => id,
                None => {
                    warn!(row = row.row_number, "行缺少店铺 ID，已跳过");
                    merged.skipped_rows += 1;
                    merged.diagnostics.push(ImportDiagnostic {
                        row_number: row.row_number,
                        column: None,
                        raw_value: String::new(),
                        level: DiagnosticLevel::Error,
                        message: t_with_args("diagnostic.missing_shop_id", &[]),
                    });
                    continue;
                }
            };

            if let Some(date) = row.revenue_date {
                if options.reject_out_of_period_rows && !options.period.contains(date) {
                    warn!(row = row.row_number, %date, period = %options.period, "行日期不在导入月份内，已跳过");
                    merged.skipped_rows += 1;
                    merged.diagnostics.push(ImportDiagnostic {
                        row_number: row.row_number,
                        column: None,
                        raw_value: date.to_string(),
                        level: DiagnosticLevel::Warning,
                        message: t_with_args(
                            "diagnostic.out_of_period",
                            &[("period", &options.period.to_string())],
                        ),
                    });
                    continue;
                }
            }

            groups.entry(shop_id).or_default().push(row);
        }

        for (shop_id, rows) in groups {
            let source_rows = rows.len();
            let reported: Vec<ReportMetrics> = rows.iter().map(|r| r.metrics).collect();
            let mut iter = rows.into_iter();
            let Some(first) = iter.next() else {
                continue;
            };

            let mut metrics = first.metrics;
            let mut shop_name = first.shop_name;
            for row in iter {
                metrics.add_amounts(&row.metrics);
                if row.shop_name.is_some() {
                    shop_name = row.shop_name;
                }
            }
            if source_rows > 1 {
                metrics.recompute_rates(&reported);
                debug!(shop_id = %shop_id, source_rows, "多行合并，比率已重算");
            }

            merged.revenues.push(ShopPeriodRevenue::new(
                &shop_id,
                options.period,
                metrics.revenue_components(),
            ));
            merged.reports.push(ComprehensiveReport {
                shop_id,
                shop_name,
                period: options.period,
                metrics,
                source_rows,
                source_batch_id: None,
            });
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::UploadRow;
    use crate::importer::column_mapping::ColumnMap;
    use crate::importer::report_normalizer::ReportNormalizer;
    use chrono::NaiveDate;

    fn options() -> MergeOptions {
        MergeOptions {
            period: ReportPeriod::new(2025, 9).unwrap(),
            default_shop_id: None,
            reject_out_of_period_rows: true,
        }
    }

    fn row(n: usize, shop: Option<&str>, day: Option<(i32, u32, u32)>, total: i64, orders: i64) -> NormalizedReportRow {
        NormalizedReportRow {
            row_number: n,
            shop_id: shop.map(str::to_string),
            shop_name: shop.map(|s| format!("Shop {}", s)),
            revenue_date: day.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            metrics: ReportMetrics {
                total_revenue: total,
                total_orders: orders,
                conversion_rate: 4.5,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_single_row_keeps_reported_rates() {
        let merged = UploadMerger::new().merge(vec![row(1, Some("A"), None, 1000, 4)], &options());
        assert_eq!(merged.reports.len(), 1);
        assert_eq!(merged.reports[0].metrics.conversion_rate, 4.5);
        assert_eq!(merged.revenues[0].components.total_revenue, 1000);
        assert_eq!(merged.revenues[0].components.platform_subsidized_revenue, None);
    }

    #[test]
    fn test_multiple_rows_summed_and_rates_recomputed() {
        let rows = vec![
            row(1, Some("B"), Some((2025, 9, 1)), 1000, 4),
            row(2, Some("A"), Some((2025, 9, 1)), 500, 1),
            row(3, Some("B"), Some((2025, 9, 2)), 2000, 6),
        ];
        let merged = UploadMerger::new().merge(rows, &options());

        // 按店铺 ID 排序
        assert_eq!(merged.reports[0].shop_id, "A");
        let b = &merged.reports[1];
        assert_eq!(b.source_rows, 2);
        assert_eq!(b.metrics.total_revenue, 3000);
        assert_eq!(b.metrics.total_orders, 10);
        assert_eq!(b.metrics.average_order_value, 300);
        // visits = 0 → 保留上报的转化率
        assert_eq!(b.metrics.conversion_rate, 4.5);
        assert_eq!(merged.skipped_rows, 0);
    }

    #[test]
    fn test_missing_shop_id_uses_default_or_skips() {
        let merged = UploadMerger::new().merge(vec![row(7, None, None, 10, 1)], &options());
        assert!(merged.reports.is_empty());
        assert_eq!(merged.skipped_rows, 1);
        assert_eq!(merged.diagnostics[0].level, DiagnosticLevel::Error);
        assert_eq!(merged.diagnostics[0].row_number, 7);

        let mut with_default = options();
        with_default.default_shop_id = Some("S-DEFAULT".to_string());
        let merged = UploadMerger::new().merge(vec![row(7, None, None, 10, 1)], &with_default);
        assert_eq!(merged.reports[0].shop_id, "S-DEFAULT");
        assert!(merged.diagnostics.is_empty());
    }

    #[test]
    fn test_out_of_period_rows() {
        let rows = vec![
            row(1, Some("A"), Some((2025, 9, 30)), 100, 1),
            row(2, Some("A"), Some((2025, 10, 1)), 900, 1),
        ];
        let merged = UploadMerger::new().merge(rows.clone(), &options());
        assert_eq!(merged.reports[0].metrics.total_revenue, 100);
        assert_eq!(merged.skipped_rows, 1);
        assert_eq!(merged.diagnostics[0].level, DiagnosticLevel::Warning);

        let mut lenient = options();
        lenient.reject_out_of_period_rows = false;
        let merged = UploadMerger::new().merge(rows, &lenient);
        assert_eq!(merged.reports[0].metrics.total_revenue, 1000);
        assert_eq!(merged.skipped_rows, 0);
    }

    #[test]
    fn test_negative_adjustment_row_keeps_stored_total() {
        let rows = vec![
            UploadRow::new(1).with("Mã Shop", "A").with("Tổng giá trị hàng hóa (₫)", "1,000"),
            UploadRow::new(2).with("Mã Shop", "A").with("Tổng giá trị hàng hóa (₫)", "-300"),
        ];
        let (normalized, _) = ReportNormalizer::new(ColumnMap::standard().unwrap()).normalize_rows(&rows);
        let merged = UploadMerger::new().merge(normalized, &options());

        assert_eq!(merged.revenues[0].components.total_revenue, 1000);
        assert_eq!(merged.reports[0].metrics.total_revenue, 1000);
    }

    #[test]
    fn test_rates_without_denominator_columns_are_kept() {
        let mut first = row(1, Some("A"), None, 1000, 0);
        first.metrics.roas = 3.0;
        let mut second = row(2, Some("A"), None, 2000, 0);
        second.metrics.roas = 3.0;

        let merged = UploadMerger::new().merge(vec![first, second], &options());
        let metrics = &merged.reports[0].metrics;
        assert_eq!(metrics.conversion_rate, 4.5);
        assert_eq!(metrics.roas, 3.0);
        assert_eq!(metrics.total_revenue, 3000);
    }
}
