// ==========================================
// 引擎集成测试（不落库）
// ==========================================
// 测试范围:
// 1. 日营收 → 月度营收 → 预计营收 → 分级
// 2. 分级边界（等于可行目标 / 等于突破目标 / 红色下限）
// 3. 汇总统计不变式
// ==========================================

mod helpers;

use chrono::NaiveDate;
use helpers::test_data_builder::{EmployeeBuilder, ShopBuilder};
use shop_revenue_engine::domain::personnel::EmployeeDirectory;
use shop_revenue_engine::domain::revenue::{GoalThresholds, RevenueComponents, RevenueEntry, ShopGoal};
use shop_revenue_engine::domain::types::{ColorCategory, ReportPeriod};
use shop_revenue_engine::engine::{
    ClassifierConfig, GoalClassifier, PerformanceEvaluator, RevenueAggregator, StatisticsRollup,
};

fn period() -> ReportPeriod {
    ReportPeriod::new(2025, 9).unwrap()
}

fn entry(shop_id: &str, day: u32, total: i64, cancelled: i64, returned: i64) -> RevenueEntry {
    RevenueEntry {
        shop_id: shop_id.to_string(),
        revenue_date: NaiveDate::from_ymd_opt(2025, 9, day).unwrap(),
        components: RevenueComponents::new(total, cancelled, returned),
    }
}

#[test]
fn test_classification_boundaries() {
    let classifier = GoalClassifier::new();
    let goals = GoalThresholds::new(Some(1_000_000), Some(1_500_000));

    assert_eq!(classifier.classify(1_500_001, &goals), ColorCategory::Green);
    // 等于突破目标不算超过
    assert_eq!(classifier.classify(1_500_000, &goals), ColorCategory::Yellow);
    assert_eq!(classifier.classify(1_000_000, &goals), ColorCategory::Yellow);
    assert_eq!(classifier.classify(999_999, &goals), ColorCategory::Red);
    assert_eq!(classifier.classify(800_000, &goals), ColorCategory::Red);
    assert_eq!(classifier.classify(799_999, &goals), ColorCategory::Purple);
    assert_eq!(classifier.classify(1, &goals), ColorCategory::Purple);
    assert_eq!(classifier.classify(0, &goals), ColorCategory::NoColor);
    assert_eq!(classifier.classify(-5, &goals), ColorCategory::NoColor);

    let no_goal = GoalThresholds::new(None, Some(10));
    assert_eq!(classifier.classify(1_000, &no_goal), ColorCategory::NoColor);
    let zero_goal = GoalThresholds::new(Some(0), None);
    assert_eq!(classifier.classify(1_000, &zero_goal), ColorCategory::NoColor);

    let strict = GoalClassifier::with_config(ClassifierConfig { red_floor_percent: 90 });
    assert_eq!(strict.classify(850_000, &goals), ColorCategory::Purple);
}

#[test]
fn test_daily_entries_to_categories() {
    let aggregator = RevenueAggregator::new();
    let entries = vec![
        entry("S1", 1, 700_000, 50_000, 0),
        entry("S1", 2, 500_000, 0, 50_000),
        entry("S2", 1, 100_000, 80_000, 40_000),
        entry("S3", 3, 300_000, 0, 0),
    ];
    let revenues = aggregator.monthly_revenue(&entries, period());
    assert_eq!(revenues.len(), 3);

    let s2 = revenues.iter().find(|r| r.shop_id == "S2").unwrap();
    let outcome = aggregator.project_shop(s2);
    assert_eq!(outcome.projected_revenue, 0);
    assert!(outcome.clamped);

    let shops = vec![
        ShopBuilder::new("S1").personnel("P1").build(),
        ShopBuilder::new("S2").personnel("P1").build(),
        ShopBuilder::new("S3").build(),
    ];
    let goals = vec![
        ShopGoal {
            shop_id: "S1".to_string(),
            period: period(),
            thresholds: GoalThresholds::new(Some(1_000_000), Some(1_200_000)),
        },
        ShopGoal {
            shop_id: "S2".to_string(),
            period: period(),
            thresholds: GoalThresholds::new(Some(1_000_000), None),
        },
    ];

    let evaluator = PerformanceEvaluator::new(GoalClassifier::new());
    let results = evaluator.evaluate_period(&shops, &revenues, &goals, period());

    // S1: 1,200,000 - 50,000 - 50,000 = 1,100,000 → 黄色
    assert_eq!(results[0].projected_revenue, 1_100_000);
    assert_eq!(results[0].category, ColorCategory::Yellow);
    assert_eq!(results[1].category, ColorCategory::NoColor);
    assert!(results[1].revenue_clamped);
    // S3 无目标
    assert_eq!(results[2].category, ColorCategory::NoColor);

    let rollup = StatisticsRollup::new();
    let stats = rollup.summarize(&results);
    assert_eq!(stats.total, results.len());
    assert_eq!(stats.by_category.total(), stats.total);
    assert_eq!(stats.by_status.total(), stats.total);

    let directory = EmployeeDirectory::new(vec![
        EmployeeBuilder::new("L1", "Lan").build(),
        EmployeeBuilder::new("P1", "Phuc").manager("L1").build(),
    ]);
    let leaders = rollup.by_leader(&results, &directory);
    assert_eq!(leaders.len(), 1);
    assert_eq!(leaders[0].shop_count, 2);
    assert_eq!(leaders[0].categories.yellow, 1);
    assert_eq!(leaders[0].categories.no_color, 1);
}
