// ==========================================
// 店铺营收分级引擎 - 引擎层
// ==========================================
// 职责: 实现业务规则（聚合 / 分级 / 汇总），不拼 SQL
// 红线: 引擎均为同步纯计算，输入全部显式传参
// ==========================================

pub mod goal_classifier;
pub mod performance_evaluator;
pub mod revenue_aggregator;
pub mod statistics_rollup;

// 重导出核心引擎
pub use goal_classifier::{
    goal_progress_percent, ClassifierConfig, GoalClassifier, DEFAULT_RED_FLOOR_PERCENT,
};
pub use performance_evaluator::PerformanceEvaluator;
pub use revenue_aggregator::{AggregationOutcome, RevenueAggregator};
pub use statistics_rollup::StatisticsRollup;
