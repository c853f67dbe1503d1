// ==========================================
// 店铺营收分级引擎 - 统计汇总
// ==========================================
// 职责: 驾驶舱计数（总数 / 分级 / 状态）+ Leader / 人员分组
// 输入: ShopPerformance 列表 + 人员索引
// 输出: ReportStatistics / LeaderBreakdown / PersonnelBreakdown
// ==========================================
// 红线: 每次全量重算，不保留增量状态
// 红线: 无上级的人员不进入 Leader 分组，但计入全局总数
// ==========================================

use crate::domain::personnel::EmployeeDirectory;
use crate::domain::statistics::{
    CategoryCounts, LeaderBreakdown, PersonnelBreakdown, ReportStatistics, ShopPerformance,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsRollup;

/// Leader 分组累加器
#[derive(Default)]
struct LeaderAccumulator {
    shop_count: usize,
    personnel: BTreeSet<String>,
    categories: CategoryCounts,
}

impl StatisticsRollup {
    pub fn new() -> Self {
        Self
    }

    /// 全局统计（单次遍历）
    pub fn summarize(&self, shops: &[ShopPerformance]) -> ReportStatistics {
        let mut stats = ReportStatistics::default();
        for shop in shops {
            stats.total += 1;
            stats.by_category.record(shop.category);
            stats.by_status.record(shop.status);
        }
        stats
    }

    /// 按 Leader（人员的上级）分组统计
    ///
    /// 排序: leader_name 升序（无名字的排最后），再按 leader_id
    #[instrument(skip(self, shops, directory), fields(shops = shops.len()))]
    pub fn by_leader(
        &self,
        shops: &[ShopPerformance],
        directory: &EmployeeDirectory,
    ) -> Vec<LeaderBreakdown> {
        let mut groups: HashMap<String, LeaderAccumulator> = HashMap::new();
        let mut ungrouped = 0usize;

        for shop in shops {
            let Some(personnel_id) = shop.personnel_id.as_deref() else {
                ungrouped += 1;
                continue;
            };
            let Some(leader_id) = directory.manager_id_of(personnel_id) else {
                ungrouped += 1;
                continue;
            };

            let acc = groups.entry(leader_id.to_string()).or_default();
            acc.shop_count += 1;
            acc.personnel.insert(personnel_id.to_string());
            acc.categories.record(shop.category);
        }

        if ungrouped > 0 {
            debug!(ungrouped, "部分店铺无上级，未进入 Leader 分组");
        }

        let mut breakdowns: Vec<LeaderBreakdown> = groups
            .into_iter()
            .map(|(leader_id, acc)| LeaderBreakdown {
                leader_name: directory.get(&leader_id).map(|e| e.name.clone()),
                leader_id,
                shop_count: acc.shop_count,
                personnel_count: acc.personnel.len(),
                categories: acc.categories,
            })
            .collect();

        breakdowns.sort_by(|a, b| {
            sort_key(a.leader_name.as_deref())
                .cmp(&sort_key(b.leader_name.as_deref()))
                .then_with(|| a.leader_id.cmp(&b.leader_id))
        });
        breakdowns
    }

    /// 按负责人员分组统计（无负责人员的店铺不进入分组）
    pub fn by_personnel(
        &self,
        shops: &[ShopPerformance],
        directory: &EmployeeDirectory,
    ) -> Vec<PersonnelBreakdown> {
        let mut groups: HashMap<String, (usize, CategoryCounts)> = HashMap::new();

        for shop in shops {
            if let Some(personnel_id) = shop.personnel_id.as_deref() {
                let entry = groups.entry(personnel_id.to_string()).or_default();
                entry.0 += 1;
                entry.1.record(shop.category);
            }
        }

        let mut breakdowns: Vec<PersonnelBreakdown> = groups
            .into_iter()
            .map(|(personnel_id, (shop_count, categories))| PersonnelBreakdown {
                personnel_name: directory.get(&personnel_id).map(|e| e.name.clone()),
                leader_id: directory.manager_id_of(&personnel_id).map(str::to_string),
                personnel_id,
                shop_count,
                categories,
            })
            .collect();

        breakdowns.sort_by(|a, b| {
            sort_key(a.personnel_name.as_deref())
                .cmp(&sort_key(b.personnel_name.as_deref()))
                .then_with(|| a.personnel_id.cmp(&b.personnel_id))
        });
        breakdowns
    }
}

/// 有名字的排在前面
fn sort_key(name: Option<&str>) -> (bool, String) {
    match name {
        Some(n) => (false, n.to_lowercase()),
        None => (true, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::personnel::Employee;
    use crate::domain::revenue::RevenueComponents;
    use crate::domain::types::{ColorCategory, ReportPeriod, ShopStatus};

    fn shop(id: &str, personnel: Option<&str>, category: ColorCategory, status: Option<ShopStatus>) -> ShopPerformance {
        ShopPerformance {
            shop_id: id.to_string(),
            shop_name: format!("Shop {}", id),
            status,
            personnel_id: personnel.map(str::to_string),
            period: ReportPeriod::new(2025, 9).unwrap(),
            components: RevenueComponents::default(),
            projected_revenue: 0,
            revenue_clamped: false,
            feasible_goal: None,
            breakthrough_goal: None,
            progress_percent: None,
            category,
        }
    }

    fn directory() -> EmployeeDirectory {
        let e = |id: &str, name: &str, manager: Option<&str>| Employee {
            id: id.to_string(),
            name: name.to_string(),
            manager_id: manager.map(str::to_string),
        };
        EmployeeDirectory::new(vec![
            e("L1", "Bình", None),
            e("L2", "An", None),
            e("P1", "Chi", Some("L1")),
            e("P2", "Dũng", Some("L1")),
            e("P3", "Hà", Some("L2")),
            e("P4", "Khoa", None),
        ])
    }

    #[test]
    fn test_summarize_empty() {
        let stats = StatisticsRollup::new().summarize(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_category.total(), 0);
        assert_eq!(stats.by_status.total(), 0);
    }

    #[test]
    fn test_summarize_totals_match() {
        let shops = vec![
            shop("S1", Some("P1"), ColorCategory::Green, Some(ShopStatus::Operating)),
            shop("S2", Some("P1"), ColorCategory::NoColor, None),
            shop("S3", None, ColorCategory::Purple, Some(ShopStatus::Stopped)),
            shop("S4", Some("P4"), ColorCategory::Red, Some(ShopStatus::New)),
        ];
        let stats = StatisticsRollup::new().summarize(&shops);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_category.total(), stats.total);
        assert_eq!(stats.by_status.total(), stats.total);
        assert_eq!(stats.by_category.no_color, 1);
        assert_eq!(stats.by_status.unset, 1);
    }

    #[test]
    fn test_by_leader_groups_and_excludes_unmanaged() {
        let shops = vec![
            shop("S1", Some("P1"), ColorCategory::Green, None),
            shop("S2", Some("P1"), ColorCategory::Yellow, None),
            shop("S3", Some("P2"), ColorCategory::Red, None),
            shop("S4", Some("P3"), ColorCategory::Purple, None),
            shop("S5", Some("P4"), ColorCategory::Green, None), // 无上级
            shop("S6", None, ColorCategory::Green, None),       // 无负责人
        ];

        let leaders = StatisticsRollup::new().by_leader(&shops, &directory());
        assert_eq!(leaders.len(), 2);

        // 按名字排序: An(L2) 在 Bình(L1) 之前
        assert_eq!(leaders[0].leader_id, "L2");
        assert_eq!(leaders[0].shop_count, 1);
        assert_eq!(leaders[0].personnel_count, 1);

        let l1 = &leaders[1];
        assert_eq!(l1.leader_id, "L1");
        assert_eq!(l1.leader_name.as_deref(), Some("Bình"));
        assert_eq!(l1.shop_count, 3);
        assert_eq!(l1.personnel_count, 2);
        assert_eq!(l1.categories.green, 1);
        assert_eq!(l1.categories.yellow, 1);
        assert_eq!(l1.categories.red, 1);
        assert_eq!(l1.categories.total(), l1.shop_count);

        // 全局统计仍包含全部店铺
        assert_eq!(StatisticsRollup::new().summarize(&shops).total, 6);
    }

    #[test]
    fn test_by_leader_unknown_leader_has_no_name() {
        let dir = EmployeeDirectory::new(vec![Employee {
            id: "P9".to_string(),
            name: "Lan".to_string(),
            manager_id: Some("L404".to_string()),
        }]);
        let shops = vec![shop("S1", Some("P9"), ColorCategory::Red, None)];
        let leaders = StatisticsRollup::new().by_leader(&shops, &dir);
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].leader_id, "L404");
        assert!(leaders[0].leader_name.is_none());
    }

    #[test]
    fn test_by_personnel() {
        let shops = vec![
            shop("S1", Some("P1"), ColorCategory::Green, None),
            shop("S2", Some("P1"), ColorCategory::Yellow, None),
            shop("S3", Some("P4"), ColorCategory::Red, None),
            shop("S4", None, ColorCategory::Red, None),
        ];
        let personnel = StatisticsRollup::new().by_personnel(&shops, &directory());
        assert_eq!(personnel.len(), 2);
        assert_eq!(personnel[0].personnel_id, "P1");
        assert_eq!(personnel[0].shop_count, 2);
        assert_eq!(personnel[0].leader_id.as_deref(), Some("L1"));
        assert_eq!(personnel[1].personnel_id, "P4");
        assert!(personnel[1].leader_id.is_none());
    }
}
