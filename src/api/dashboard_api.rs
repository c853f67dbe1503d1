// ==========================================
// 店铺营收分级引擎 - 驾驶舱 API
// ==========================================
// 职责: 取数 → 评估（聚合 + 分级）→ 统计汇总，供展示层调用
// 架构: API 层 → Repository 取数 + Engine 纯计算
// ==========================================
// 红线: 每次请求全量重算，不缓存分级结果
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{debug, info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::revenue::{GoalThresholds, ShopGoal};
use crate::domain::statistics::{
    DashboardSnapshot, LeaderBreakdown, PersonnelBreakdown, ReportStatistics, ShopPerformance,
};
use crate::domain::types::ReportPeriod;
use crate::engine::{GoalClassifier, PerformanceEvaluator, StatisticsRollup};
use crate::repository::{GoalRepository, ShopDirectoryRepository, ShopRevenueRepository};

/// 解析请求中的月份参数
pub(crate) fn parse_period(raw: &str) -> ApiResult<ReportPeriod> {
    if raw.trim().is_empty() {
        return Err(ApiError::InvalidInput("月份不能为空".to_string()));
    }
    raw.parse::<ReportPeriod>().map_err(ApiError::InvalidInput)
}

// ==========================================
// DashboardApi - 驾驶舱 API
// ==========================================
pub struct DashboardApi {
    shop_repo: Arc<ShopDirectoryRepository>,
    revenue_repo: Arc<ShopRevenueRepository>,
    goal_repo: Arc<GoalRepository>,
    config: Arc<ConfigManager>,
    rollup: StatisticsRollup,
}

impl DashboardApi {
    pub fn new(
        shop_repo: Arc<ShopDirectoryRepository>,
        revenue_repo: Arc<ShopRevenueRepository>,
        goal_repo: Arc<GoalRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            shop_repo,
            revenue_repo,
            goal_repo,
            config,
            rollup: StatisticsRollup::new(),
        }
    }

    /// 基于同一连接构造全部依赖
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(Self::new(
            Arc::new(ShopDirectoryRepository::from_connection(conn.clone())),
            Arc::new(ShopRevenueRepository::from_connection(conn.clone())),
            Arc::new(GoalRepository::from_connection(conn)),
            Arc::new(config),
        ))
    }

    fn evaluator(&self) -> ApiResult<PerformanceEvaluator> {
        let classifier_config = self
            .config
            .load_classifier_config()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(PerformanceEvaluator::new(GoalClassifier::with_config(classifier_config)))
    }

    // ==========================================
    // 分级查询
    // ==========================================

    /// 评估某月全部店铺（店铺按 shop_id 升序）
    #[instrument(skip(self))]
    pub fn classify_period(&self, period: &str) -> ApiResult<Vec<ShopPerformance>> {
        let period = parse_period(period)?;
        let shops = self.shop_repo.list_shops()?;
        let revenues = self.revenue_repo.list_revenues_by_period(period)?;
        let goals = self.goal_repo.list_goals_by_period(period)?;
        debug!(shops = shops.len(), revenues = revenues.len(), goals = goals.len(), "取数完成");

        Ok(self.evaluator()?.evaluate_period(&shops, &revenues, &goals, period))
    }

    /// 评估单个店铺
    pub fn classify_shop(&self, shop_id: &str, period: &str) -> ApiResult<ShopPerformance> {
        if shop_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("店铺ID不能为空".to_string()));
        }
        let period = parse_period(period)?;
        let shop = self
            .shop_repo
            .find_shop(shop_id)?
            .ok_or_else(|| ApiError::NotFound(format!("店铺(id={})不存在", shop_id)))?;
        let revenue = self.revenue_repo.find_revenue(shop_id, period)?;
        let goals = self.goal_repo.find_goal(shop_id, period)?;

        Ok(self
            .evaluator()?
            .evaluate_shop(&shop, period, revenue.as_ref(), goals.as_ref()))
    }

    // ==========================================
    // 统计查询
    // ==========================================

    pub fn get_report_statistics(&self, period: &str) -> ApiResult<ReportStatistics> {
        let shops = self.classify_period(period)?;
        Ok(self.rollup.summarize(&shops))
    }

    pub fn get_leader_breakdown(&self, period: &str) -> ApiResult<Vec<LeaderBreakdown>> {
        let shops = self.classify_period(period)?;
        let directory = self.shop_repo.load_directory()?;
        Ok(self.rollup.by_leader(&shops, &directory))
    }

    pub fn get_personnel_breakdown(&self, period: &str) -> ApiResult<Vec<PersonnelBreakdown>> {
        let shops = self.classify_period(period)?;
        let directory = self.shop_repo.load_directory()?;
        Ok(self.rollup.by_personnel(&shops, &directory))
    }

    /// 驾驶舱快照（明细 + 统计 + 分组，一次取数）
    #[instrument(skip(self))]
    pub fn get_dashboard(&self, period: &str) -> ApiResult<DashboardSnapshot> {
        let shops = self.classify_period(period)?;
        let period = parse_period(period)?;
        let directory = self.shop_repo.load_directory()?;

        let statistics = self.rollup.summarize(&shops);
        let leaders = self.rollup.by_leader(&shops, &directory);
        let personnel = self.rollup.by_personnel(&shops, &directory);
        info!(
            period = %period,
            total = statistics.total,
            green = statistics.by_category.green,
            no_color = statistics.by_category.no_color,
            "驾驶舱快照生成完成"
        );

        Ok(DashboardSnapshot {
            period,
            shops,
            statistics,
            leaders,
            personnel,
        })
    }

    // ==========================================
    // 目标维护
    // ==========================================

    /// 设置单店月度目标（后写覆盖）
    ///
    /// 目标值 <= 0 按未设置处理，不拒绝
    pub fn set_shop_goal(
        &self,
        shop_id: &str,
        period: &str,
        feasible_goal: Option<i64>,
        breakthrough_goal: Option<i64>,
    ) -> ApiResult<ShopGoal> {
        if shop_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("店铺ID不能为空".to_string()));
        }
        let goal = ShopGoal {
            shop_id: shop_id.trim().to_string(),
            period: parse_period(period)?,
            thresholds: GoalThresholds::new(feasible_goal, breakthrough_goal),
        };
        self.goal_repo.upsert_goal(&goal)?;
        info!(shop_id = %goal.shop_id, period = %goal.period, "月度目标已更新");
        Ok(goal)
    }
}
