// ==========================================
// 店铺营收分级引擎 - 统计汇总输出
// ==========================================
// 职责: 分级计数 / 状态计数 / Leader 与人员分组 / 驾驶舱快照
// 红线: 纯数据结构，可直接序列化为 JSON
// ==========================================

use crate::domain::revenue::RevenueComponents;
use crate::domain::types::{ColorCategory, ReportPeriod, ShopStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// CategoryCounts - 分级计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub purple: usize,
    #[serde(rename = "no-color")]
    pub no_color: usize,
}

impl CategoryCounts {
    pub fn record(&mut self, category: ColorCategory) {
        match category {
            ColorCategory::Green => self.green += 1,
            ColorCategory::Yellow => self.yellow += 1,
            ColorCategory::Red => self.red += 1,
            ColorCategory::Purple => self.purple += 1,
            ColorCategory::NoColor => self.no_color += 1,
        }
    }

    pub fn get(&self, category: ColorCategory) -> usize {
        match category {
            ColorCategory::Green => self.green,
            ColorCategory::Yellow => self.yellow,
            ColorCategory::Red => self.red,
            ColorCategory::Purple => self.purple,
            ColorCategory::NoColor => self.no_color,
        }
    }

    pub fn total(&self) -> usize {
        self.green + self.yellow + self.red + self.purple + self.no_color
    }
}

// ==========================================
// StatusCounts - 店铺状态计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub operating: usize,
    pub new_shop: usize,
    pub stopped: usize,
    pub unset: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: Option<ShopStatus>) {
        match status {
            Some(ShopStatus::Operating) => self.operating += 1,
            Some(ShopStatus::New) => self.new_shop += 1,
            Some(ShopStatus::Stopped) => self.stopped += 1,
            None => self.unset += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.operating + self.new_shop + self.stopped + self.unset
    }
}

// ==========================================
// ReportStatistics - 全局统计
// ==========================================
// 不变式: total == by_category.total() == by_status.total()
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStatistics {
    pub total: usize,
    pub by_category: CategoryCounts,
    pub by_status: StatusCounts,
}

// ==========================================
// LeaderBreakdown - Leader 分组统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderBreakdown {
    pub leader_id: String,
    pub leader_name: Option<String>, // 上级不在人员表中时为空
    pub shop_count: usize,
    pub personnel_count: usize, // 下属人员（去重）
    pub categories: CategoryCounts,
}

// ==========================================
// PersonnelBreakdown - 人员分组统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonnelBreakdown {
    pub personnel_id: String,
    pub personnel_name: Option<String>,
    pub leader_id: Option<String>,
    pub shop_count: usize,
    pub categories: CategoryCounts,
}

// ==========================================
// ShopPerformance - 店铺月度表现
// ==========================================
// 用途: 统计汇总的输入，也是驾驶舱明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopPerformance {
    pub shop_id: String,
    pub shop_name: String,
    pub status: Option<ShopStatus>,
    pub personnel_id: Option<String>,
    pub period: ReportPeriod,
    pub components: RevenueComponents,
    pub projected_revenue: i64,
    pub revenue_clamped: bool, // 取消+退货超过总额，预计营收被截断为 0
    pub feasible_goal: Option<i64>,
    pub breakthrough_goal: Option<i64>,
    pub progress_percent: Option<f64>, // 预计营收 / 可行目标
    pub category: ColorCategory,
}

// ==========================================
// DashboardSnapshot - 驾驶舱快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub period: ReportPeriod,
    pub shops: Vec<ShopPerformance>,
    pub statistics: ReportStatistics,
    pub leaders: Vec<LeaderBreakdown>,
    pub personnel: Vec<PersonnelBreakdown>,
}
