// ==========================================
// 店铺营收分级引擎 - 营收聚合器
// ==========================================
// 职责: 由营收构成计算预计营收 / 按店铺（按日）汇总明细 / 重传覆盖合并
// 输入: RevenueComponents / RevenueEntry / ShopPeriodRevenue
// 输出: AggregationOutcome / 汇总映射
// ==========================================
// 红线: 预计营收 = max(0, 总额 - 取消 - 退货)，负值不得流入分级器
// 红线: 同一 (shop_id, period) 重传为覆盖，不是累加
// ==========================================

use crate::domain::revenue::{RevenueComponents, RevenueEntry, ShopPeriodRevenue};
use crate::domain::types::ReportPeriod;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};

// ==========================================
// AggregationOutcome - 聚合结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOutcome {
    pub projected_revenue: i64,
    /// 扣减后为负、被截断为 0（或某项输入为负被截断）
    pub clamped: bool,
}

// ==========================================
// RevenueAggregator - 营收聚合器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct RevenueAggregator;

impl RevenueAggregator {
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // 预计营收
    // ==========================================

    /// 计算预计营收（纯函数）
    ///
    /// 规则:
    /// 1) 每项输入先截断到 >= 0（负数调整行不被隐式解释为扣减）
    /// 2) projected = total - cancelled - returned
    /// 3) 结果截断到 >= 0
    ///
    /// 平台补贴不参与扣减
    pub fn project(&self, components: &RevenueComponents) -> AggregationOutcome {
        let total = components.total_revenue.max(0);
        let cancelled = components.cancelled_revenue.max(0);
        let returned = components.returned_revenue.max(0);

        let input_clamped = components.total_revenue < 0
            || components.cancelled_revenue < 0
            || components.returned_revenue < 0;

        let raw = total.saturating_sub(cancelled).saturating_sub(returned);
        let projected_revenue = raw.max(0);

        AggregationOutcome {
            projected_revenue,
            clamped: input_clamped || raw < 0,
        }
    }

    /// 仅返回预计营收
    pub fn projected_revenue(&self, components: &RevenueComponents) -> i64 {
        self.project(components).projected_revenue
    }

    /// 店铺月度营收的预计营收（带日志）
    pub fn project_shop(&self, revenue: &ShopPeriodRevenue) -> AggregationOutcome {
        let outcome = self.project(&revenue.components);
        if outcome.clamped {
            warn!(
                shop_id = %revenue.shop_id,
                period = %revenue.period,
                total = revenue.components.total_revenue,
                cancelled = revenue.components.cancelled_revenue,
                returned = revenue.components.returned_revenue,
                "预计营收被截断为非负值"
            );
        }
        outcome
    }

    // ==========================================
    // 明细汇总
    // ==========================================

    /// 按店铺汇总明细
    pub fn sum_by_shop(&self, entries: &[RevenueEntry]) -> BTreeMap<String, RevenueComponents> {
        let mut totals: BTreeMap<String, RevenueComponents> = BTreeMap::new();
        for entry in entries {
            totals
                .entry(entry.shop_id.clone())
                .or_default()
                .add(&entry.components);
        }
        totals
    }

    /// 按 (店铺, 日期) 汇总明细
    pub fn sum_by_shop_and_date(
        &self,
        entries: &[RevenueEntry],
    ) -> BTreeMap<(String, NaiveDate), RevenueComponents> {
        let mut totals: BTreeMap<(String, NaiveDate), RevenueComponents> = BTreeMap::new();
        for entry in entries {
            totals
                .entry((entry.shop_id.clone(), entry.revenue_date))
                .or_default()
                .add(&entry.components);
        }
        totals
    }

    /// 汇总指定月份内的明细，生成店铺月度营收（按 shop_id 排序）
    ///
    /// 月份外的明细被忽略
    #[instrument(skip(self, entries), fields(count = entries.len(), period = %period))]
    pub fn monthly_revenue(&self, entries: &[RevenueEntry], period: ReportPeriod) -> Vec<ShopPeriodRevenue> {
        let in_period: Vec<RevenueEntry> = entries
            .iter()
            .filter(|e| period.contains(e.revenue_date))
            .cloned()
            .collect();

        let ignored = entries.len() - in_period.len();
        if ignored > 0 {
            debug!(ignored, "忽略月份外的明细");
        }

        self.sum_by_shop(&in_period)
            .into_iter()
            .map(|(shop_id, components)| ShopPeriodRevenue::new(shop_id, period, components))
            .collect()
    }

    // ==========================================
    // 重传覆盖
    // ==========================================

    /// 按 (shop_id, period) 覆盖合并（后写覆盖先写）
    ///
    /// 返回被覆盖的条数
    pub fn merge_last_write_wins(
        &self,
        existing: &mut HashMap<(String, ReportPeriod), ShopPeriodRevenue>,
        incoming: impl IntoIterator<Item = ShopPeriodRevenue>,
    ) -> usize {
        let mut replaced = 0;
        for revenue in incoming {
            if existing.insert(revenue.key(), revenue).is_some() {
                replaced += 1;
            }
        }
        replaced
    }
}
