// ==========================================
// 店铺营收分级引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod personnel;
pub mod report;
pub mod revenue;
pub mod statistics;
pub mod types;

// 重导出核心类型
pub use personnel::{Employee, EmployeeDirectory, Shop};
pub use report::{
    ComprehensiveReport, DiagnosticLevel, ImportBatch, ImportDiagnostic, ImportOutcome,
    NormalizedReportRow, RawCell, ReportMetrics, UploadRow,
};
pub use revenue::{GoalThresholds, RevenueComponents, RevenueEntry, ShopGoal, ShopPeriodRevenue};
pub use statistics::{
    CategoryCounts, DashboardSnapshot, LeaderBreakdown, PersonnelBreakdown, ReportStatistics,
    ShopPerformance, StatusCounts,
};
pub use types::{ColorCategory, ReportPeriod, ShopStatus};
