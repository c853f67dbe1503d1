// ==========================================
// 店铺营收分级引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 月度营收 × 目标 → 颜色分级 → 汇总统计
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "vi");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部报表
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ColorCategory, ReportPeriod, ShopStatus};

// 领域实体
pub use domain::{
    ComprehensiveReport, DashboardSnapshot, Employee, EmployeeDirectory, GoalThresholds,
    ImportBatch, ImportDiagnostic, ImportOutcome, ReportStatistics, RevenueComponents, Shop,
    ShopGoal, ShopPerformance, ShopPeriodRevenue,
};

// 引擎
pub use engine::{GoalClassifier, PerformanceEvaluator, RevenueAggregator, StatisticsRollup};

// API
pub use api::{ApiError, DashboardApi, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称（同时用作本地数据目录名）
pub const APP_NAME: &str = "shop-revenue-engine";
