// ==========================================
// 店铺营收分级引擎 - 店铺表现评估
// ==========================================
// 职责: 串联 聚合器 → 分级器，生成每店的月度表现
// 输入: 店铺列表 + 月度营收 + 月度目标
// 输出: Vec<ShopPerformance>（保持店铺输入顺序）
// ==========================================
// 红线: 只消费已取回的数据，不访问存储
// ==========================================

use crate::domain::personnel::Shop;
use crate::domain::revenue::{GoalThresholds, ShopGoal, ShopPeriodRevenue};
use crate::domain::statistics::ShopPerformance;
use crate::domain::types::ReportPeriod;
use crate::engine::goal_classifier::{goal_progress_percent, GoalClassifier};
use crate::engine::revenue_aggregator::RevenueAggregator;
use std::collections::{HashMap, HashSet};
use tracing::{instrument, trace, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceEvaluator {
    aggregator: RevenueAggregator,
    classifier: GoalClassifier,
}

impl PerformanceEvaluator {
    pub fn new(classifier: GoalClassifier) -> Self {
        Self {
            aggregator: RevenueAggregator::new(),
            classifier,
        }
    }

    /// 评估单个店铺
    ///
    /// 无营收记录 → 营收视为 0；无目标记录 → 目标视为未设置
    pub fn evaluate_shop(
        &self,
        shop: &Shop,
        period: ReportPeriod,
        revenue: Option<&ShopPeriodRevenue>,
        goals: Option<&GoalThresholds>,
    ) -> ShopPerformance {
        let components = revenue.map(|r| r.components).unwrap_or_default();
        let outcome = match revenue {
            Some(r) => self.aggregator.project_shop(r),
            None => self.aggregator.project(&components),
        };
        let goals = goals.copied().unwrap_or_default();
        let (category, reason) = self
            .classifier
            .classify_with_reason(outcome.projected_revenue, &goals);

        trace!(shop_id = %shop.shop_id, %category, reason = %reason, "店铺分级完成");

        ShopPerformance {
            shop_id: shop.shop_id.clone(),
            shop_name: shop.shop_name.clone(),
            status: shop.status,
            personnel_id: shop.personnel_id.clone(),
            period,
            components,
            projected_revenue: outcome.projected_revenue,
            revenue_clamped: outcome.clamped,
            feasible_goal: goals.feasible_goal,
            breakthrough_goal: goals.breakthrough_goal,
            progress_percent: goal_progress_percent(outcome.projected_revenue, &goals),
            category,
        }
    }

    /// 评估一个月份的全部店铺
    ///
    /// 不属于该月份的营收/目标记录被忽略；
    /// 店铺列表之外的营收记录记录告警后忽略
    #[instrument(skip_all, fields(period = %period, shops = shops.len()))]
    pub fn evaluate_period(
        &self,
        shops: &[Shop],
        revenues: &[ShopPeriodRevenue],
        goals: &[ShopGoal],
        period: ReportPeriod,
    ) -> Vec<ShopPerformance> {
        let revenue_by_shop: HashMap<&str, &ShopPeriodRevenue> = revenues
            .iter()
            .filter(|r| r.period == period)
            .map(|r| (r.shop_id.as_str(), r))
            .collect();
        let goals_by_shop: HashMap<&str, &GoalThresholds> = goals
            .iter()
            .filter(|g| g.period == period)
            .map(|g| (g.shop_id.as_str(), &g.thresholds))
            .collect();

        let known: HashSet<&str> = shops.iter().map(|s| s.shop_id.as_str()).collect();
        let orphans = revenue_by_shop.keys().filter(|id| !known.contains(**id)).count();
        if orphans > 0 {
            warn!(orphans, "存在不在店铺列表中的营收记录，已忽略");
        }

        shops
            .iter()
            .map(|shop| {
                self.evaluate_shop(
                    shop,
                    period,
                    revenue_by_shop.get(shop.shop_id.as_str()).copied(),
                    goals_by_shop.get(shop.shop_id.as_str()).copied(),
                )
            })
            .collect()
    }
}
