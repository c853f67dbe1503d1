// ==========================================
// 店铺营收分级引擎 - 目标分级器
// ==========================================
// 职责: 按预计营收与目标阈值判定颜色分级
// 输入: projected_revenue + GoalThresholds
// 输出: ColorCategory（+ 判定原因）
// ==========================================
// 规则（顺序执行，命中即返回）:
// 1) projected <= 0                               → no-color
// 2) feasible 为空或 <= 0                          → no-color
// 3) breakthrough 已设置 且 projected > breakthrough → green（严格大于）
// 4) projected >= feasible                        → yellow（等于可行目标为 yellow）
// 5) projected >= feasible * 80%                  → red
// 6) 其他                                          → purple
// ==========================================
// 红线: 纯函数，无隐藏状态；边界 > / >= 不得改动
// ==========================================

use crate::domain::revenue::GoalThresholds;
use crate::domain::types::ColorCategory;
use serde::{Deserialize, Serialize};

/// red 区间下限（可行目标的百分比）默认值
pub const DEFAULT_RED_FLOOR_PERCENT: u32 = 80;

// ==========================================
// ClassifierConfig - 分级器配置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// red 区间下限，按可行目标的整数百分比表示（整数运算，避免浮点误差）
    pub red_floor_percent: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            red_floor_percent: DEFAULT_RED_FLOOR_PERCENT,
        }
    }
}

// ==========================================
// GoalClassifier - 目标分级器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalClassifier {
    config: ClassifierConfig,
}

impl GoalClassifier {
    /// 使用默认配置（red 下限 80%）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ClassifierConfig {
        self.config
    }

    /// 判定颜色分级
    pub fn classify(&self, projected_revenue: i64, goals: &GoalThresholds) -> ColorCategory {
        self.classify_with_reason(projected_revenue, goals).0
    }

    /// 判定颜色分级，并返回命中的规则
    pub fn classify_with_reason(
        &self,
        projected_revenue: i64,
        goals: &GoalThresholds,
    ) -> (ColorCategory, String) {
        // 规则1: 无营收
        if projected_revenue <= 0 {
            return (
                ColorCategory::NoColor,
                format!("RULE_NO_REVENUE: projected={}", projected_revenue),
            );
        }

        // 规则2: 未设可行目标
        let feasible = match goals.feasible_goal {
            Some(goal) if goal > 0 => goal,
            other => {
                return (
                    ColorCategory::NoColor,
                    format!("RULE_NO_GOAL: feasible={:?}", other),
                )
            }
        };

        // 规则3: 超过突破目标（严格大于）
        if let Some(breakthrough) = goals.breakthrough_goal.filter(|b| *b > 0) {
            if projected_revenue > breakthrough {
                return (
                    ColorCategory::Green,
                    format!(
                        "RULE_GREEN: projected={} > breakthrough={}",
                        projected_revenue, breakthrough
                    ),
                );
            }
        }

        // 规则4: 达成可行目标
        if projected_revenue >= feasible {
            return (
                ColorCategory::Yellow,
                format!("RULE_YELLOW: projected={} >= feasible={}", projected_revenue, feasible),
            );
        }

        // 规则5: 达到可行目标的 red_floor_percent
        if self.reaches_red_floor(projected_revenue, feasible) {
            return (
                ColorCategory::Red,
                format!(
                    "RULE_RED: projected={} >= feasible={} * {}%",
                    projected_revenue, feasible, self.config.red_floor_percent
                ),
            );
        }

        // 规则6: 其他
        (
            ColorCategory::Purple,
            format!(
                "RULE_PURPLE: projected={} < feasible={} * {}%",
                projected_revenue, feasible, self.config.red_floor_percent
            ),
        )
    }

    /// projected * 100 >= feasible * red_floor_percent
    fn reaches_red_floor(&self, projected_revenue: i64, feasible: i64) -> bool {
        let lhs = i128::from(projected_revenue) * 100;
        let rhs = i128::from(feasible) * i128::from(self.config.red_floor_percent);
        lhs >= rhs
    }
}

/// 目标完成度（百分数，供展示）
///
/// 未设可行目标时返回 None
pub fn goal_progress_percent(projected_revenue: i64, goals: &GoalThresholds) -> Option<f64> {
    match goals.feasible_goal {
        Some(goal) if goal > 0 => Some(projected_revenue.max(0) as f64 * 100.0 / goal as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goals(feasible: Option<i64>, breakthrough: Option<i64>) -> GoalThresholds {
        GoalThresholds::new(feasible, breakthrough)
    }

    #[test]
    fn test_boundary_table() {
        let classifier = GoalClassifier::new();
        let g = goals(Some(100), Some(200));

        let cases = [
            (201, ColorCategory::Green),
            (200, ColorCategory::Yellow),
            (150, ColorCategory::Yellow),
            (100, ColorCategory::Yellow),
            (99, ColorCategory::Red),
            (80, ColorCategory::Red),
            (79, ColorCategory::Purple),
            (1, ColorCategory::Purple),
            (0, ColorCategory::NoColor),
            (-5, ColorCategory::NoColor),
        ];

        for (projected, expected) in cases {
            assert_eq!(
                classifier.classify(projected, &g),
                expected,
                "projected={}",
                projected
            );
        }
    }

    #[test]
    fn test_missing_feasible_goal_is_no_color() {
        let classifier = GoalClassifier::new();
        assert_eq!(classifier.classify(1_000_000, &goals(None, Some(200))), ColorCategory::NoColor);
        assert_eq!(classifier.classify(1_000_000, &goals(Some(0), None)), ColorCategory::NoColor);
        assert_eq!(classifier.classify(1_000_000, &goals(None, None)), ColorCategory::NoColor);
    }

    #[test]
    fn test_missing_breakthrough_never_green() {
        let classifier = GoalClassifier::new();
        assert_eq!(classifier.classify(1_000_000, &goals(Some(100), None)), ColorCategory::Yellow);
        assert_eq!(classifier.classify(1_000_000, &goals(Some(100), Some(0))), ColorCategory::Yellow);
    }

    #[test]
    fn test_breakthrough_below_feasible() {
        // 突破目标低于可行目标时仍按顺序判定
        let classifier = GoalClassifier::new();
        let g = goals(Some(100), Some(50));
        assert_eq!(classifier.classify(60, &g), ColorCategory::Green);
        assert_eq!(classifier.classify(50, &g), ColorCategory::Purple);
    }

    #[test]
    fn test_classification_is_pure() {
        let classifier = GoalClassifier::new();
        let g = goals(Some(1_000), Some(2_000));
        let first: Vec<_> = (0..3_000).step_by(7).map(|p| classifier.classify(p, &g)).collect();
        let second: Vec<_> = (0..3_000).step_by(7).map(|p| classifier.classify(p, &g)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_red_floor_uses_exact_integer_math() {
        let classifier = GoalClassifier::new();
        // 3 * 0.8 = 2.4000000000000004 in floating point
        assert_eq!(classifier.classify(3, &goals(Some(3), None)), ColorCategory::Yellow);
        assert_eq!(classifier.classify(8, &goals(Some(10), None)), ColorCategory::Red);
        assert_eq!(classifier.classify(7, &goals(Some(10), None)), ColorCategory::Purple);
        assert_eq!(
            classifier.classify(i64::MAX, &goals(Some(i64::MAX), None)),
            ColorCategory::Yellow
        );
    }

    #[test]
    fn test_custom_red_floor() {
        let classifier = GoalClassifier::with_config(ClassifierConfig { red_floor_percent: 90 });
        let g = goals(Some(100), None);
        assert_eq!(classifier.classify(90, &g), ColorCategory::Red);
        assert_eq!(classifier.classify(89, &g), ColorCategory::Purple);
    }

    #[test]
    fn test_reason_names_rule() {
        let classifier = GoalClassifier::new();
        let (category, reason) = classifier.classify_with_reason(200, &goals(Some(100), Some(200)));
        assert_eq!(category, ColorCategory::Yellow);
        assert!(reason.starts_with("RULE_YELLOW"));
    }

    #[test]
    fn test_goal_progress_percent() {
        assert_eq!(goal_progress_percent(50, &goals(Some(200), None)), Some(25.0));
        assert_eq!(goal_progress_percent(-10, &goals(Some(200), None)), Some(0.0));
        assert_eq!(goal_progress_percent(50, &goals(None, None)), None);
    }
}
