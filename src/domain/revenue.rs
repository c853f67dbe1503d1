// ==========================================
// 店铺营收分级引擎 - 营收与目标实体
// ==========================================
// 职责: ShopPeriodRevenue / RevenueEntry / GoalThresholds
// 红线: 金额统一为最小货币单位的整数（i64）
// 红线: 预计营收只派生、不落库为事实来源
// ==========================================

use crate::domain::types::ReportPeriod;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// RevenueComponents - 营收构成
// ==========================================
// 用途: 聚合器输入（总额 / 取消 / 退货 / 平台补贴）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueComponents {
    pub total_revenue: i64,                        // 商品总额
    pub cancelled_revenue: i64,                    // 取消金额
    pub returned_revenue: i64,                     // 退货金额
    pub platform_subsidized_revenue: Option<i64>, // 平台补贴金额（仅展示，不参与扣减）
}

impl RevenueComponents {
    pub fn new(total_revenue: i64, cancelled_revenue: i64, returned_revenue: i64) -> Self {
        Self {
            total_revenue,
            cancelled_revenue,
            returned_revenue,
            platform_subsidized_revenue: None,
        }
    }

    /// 逐项相加（用于同店多行汇总）
    ///
    /// 每项先截断到 >= 0，负数调整行不会冲减已累计的金额
    pub fn add(&mut self, other: &RevenueComponents) {
        self.total_revenue = self.total_revenue.max(0).saturating_add(other.total_revenue.max(0));
        self.cancelled_revenue = self
            .cancelled_revenue
            .max(0)
            .saturating_add(other.cancelled_revenue.max(0));
        self.returned_revenue = self
            .returned_revenue
            .max(0)
            .saturating_add(other.returned_revenue.max(0));
        self.platform_subsidized_revenue = match (
            self.platform_subsidized_revenue.filter(|v| *v > 0),
            other.platform_subsidized_revenue.filter(|v| *v > 0),
        ) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
        };
    }
}

// ==========================================
// ShopPeriodRevenue - 店铺月度营收
// ==========================================
// 唯一键: (shop_id, period)，重传覆盖
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopPeriodRevenue {
    pub shop_id: String,
    pub period: ReportPeriod,
    #[serde(flatten)]
    pub components: RevenueComponents,
    pub source_batch_id: Option<String>, // 来源导入批次
}

impl ShopPeriodRevenue {
    pub fn new(shop_id: impl Into<String>, period: ReportPeriod, components: RevenueComponents) -> Self {
        Self {
            shop_id: shop_id.into(),
            period,
            components,
            source_batch_id: None,
        }
    }

    /// 覆盖键
    pub fn key(&self) -> (String, ReportPeriod) {
        (self.shop_id.clone(), self.period)
    }
}

// ==========================================
// RevenueEntry - 日营收明细
// ==========================================
// 用途: 月内按天上传的明细行，按店铺（可选按日）汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueEntry {
    pub shop_id: String,
    pub revenue_date: NaiveDate,
    #[serde(flatten)]
    pub components: RevenueComponents,
}

// ==========================================
// GoalThresholds - 目标阈值
// ==========================================
// feasible_goal 为空或 <= 0 → 无法分级
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalThresholds {
    pub feasible_goal: Option<i64>,     // 可行目标
    pub breakthrough_goal: Option<i64>, // 突破目标
}

impl GoalThresholds {
    pub fn new(feasible_goal: Option<i64>, breakthrough_goal: Option<i64>) -> Self {
        Self {
            feasible_goal,
            breakthrough_goal,
        }
    }

    /// 可行目标是否已设置（非空且 > 0）
    pub fn has_feasible_goal(&self) -> bool {
        matches!(self.feasible_goal, Some(goal) if goal > 0)
    }

    /// 突破目标是否已设置（非空且 > 0）
    pub fn has_breakthrough_goal(&self) -> bool {
        matches!(self.breakthrough_goal, Some(goal) if goal > 0)
    }
}

// ==========================================
// ShopGoal - 店铺月度目标（落库形态）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopGoal {
    pub shop_id: String,
    pub period: ReportPeriod,
    #[serde(flatten)]
    pub thresholds: GoalThresholds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_add() {
        let mut acc = RevenueComponents::new(100, 10, 5);
        acc.add(&RevenueComponents {
            total_revenue: 50,
            cancelled_revenue: 0,
            returned_revenue: 5,
            platform_subsidized_revenue: Some(7),
        });
        assert_eq!(acc.total_revenue, 150);
        assert_eq!(acc.cancelled_revenue, 10);
        assert_eq!(acc.returned_revenue, 10);
        assert_eq!(acc.platform_subsidized_revenue, Some(7));
    }

    #[test]
    fn test_components_add_clamps_negative_entries() {
        let mut acc = RevenueComponents::new(1000, 200, 0);
        acc.add(&RevenueComponents::new(-300, -150, 0));
        assert_eq!(acc.total_revenue, 1000);
        assert_eq!(acc.cancelled_revenue, 200);

        // 累加起点本身为负时同样截断
        let mut acc = RevenueComponents::new(-10, 0, 0);
        acc.add(&RevenueComponents::new(5, 0, 0));
        assert_eq!(acc.total_revenue, 5);
    }

    #[test]
    fn test_has_feasible_goal() {
        assert!(!GoalThresholds::new(None, Some(200)).has_feasible_goal());
        assert!(!GoalThresholds::new(Some(0), Some(200)).has_feasible_goal());
        assert!(GoalThresholds::new(Some(100), None).has_feasible_goal());
    }

    #[test]
    fn test_shop_period_revenue_json_is_flat() {
        let period = ReportPeriod::new(2025, 9).unwrap();
        let row = ShopPeriodRevenue::new("shop_A", period, RevenueComponents::new(1000, 0, 0));
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["period"], "2025-09");
        assert_eq!(json["total_revenue"], 1000);
    }
}
