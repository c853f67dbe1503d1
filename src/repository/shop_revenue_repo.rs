// ==========================================
// 店铺营收分级引擎 - 月度营收 / 综合报表 / 导入批次仓储
// ==========================================
// 职责: shop_period_revenue / comprehensive_report / import_batch 三表读写
// 红线: Repository 不含业务逻辑（合并、分级均在上游完成）
// 红线: (shop_id, period) 唯一，写入一律 ON CONFLICT DO UPDATE（后写覆盖）
// ==========================================

use crate::domain::report::{ComprehensiveReport, ImportBatch, ReportMetrics};
use crate::domain::revenue::{RevenueComponents, ShopPeriodRevenue};
use crate::domain::types::ReportPeriod;
use crate::repository::error::{field_error, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ==========================================
// ReportImportRepository Trait
// ==========================================
// 用途: 导入管道的落库接口
// 实现者: ShopRevenueRepository
#[async_trait]
pub trait ReportImportRepository: Send + Sync {
    /// 单事务写入一次导入的全部结果（批次 + 营收 + 综合报表）
    ///
    /// # 返回
    /// - Ok(usize): 覆盖写入的店铺数
    async fn save_import(
        &self,
        batch: &ImportBatch,
        revenues: &[ShopPeriodRevenue],
        reports: &[ComprehensiveReport],
    ) -> RepositoryResult<usize>;
}

// ==========================================
// ShopRevenueRepository
// ==========================================
pub struct ShopRevenueRepository {
    conn: Arc<Mutex<Connection>>,
}

const REVENUE_UPSERT_SQL: &str = r#"
    INSERT INTO shop_period_revenue (
        shop_id, period, total_revenue, cancelled_revenue, returned_revenue,
        platform_subsidized_revenue, source_batch_id, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(shop_id, period) DO UPDATE SET
        total_revenue = excluded.total_revenue,
        cancelled_revenue = excluded.cancelled_revenue,
        returned_revenue = excluded.returned_revenue,
        platform_subsidized_revenue = excluded.platform_subsidized_revenue,
        source_batch_id = excluded.source_batch_id,
        updated_at = excluded.updated_at
"#;

const REPORT_UPSERT_SQL: &str = r#"
    INSERT INTO comprehensive_report (
        shop_id, period, shop_name, metrics_json, source_rows, source_batch_id, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(shop_id, period) DO UPDATE SET
        shop_name = excluded.shop_name,
        metrics_json = excluded.metrics_json,
        source_rows = excluded.source_rows,
        source_batch_id = excluded.source_batch_id,
        updated_at = excluded.updated_at
"#;

const REVENUE_COLUMNS: &str = "shop_id, period, total_revenue, cancelled_revenue, returned_revenue, \
                               platform_subsidized_revenue, source_batch_id";

const BATCH_COLUMNS: &str = "batch_id, period, file_name, total_rows, imported_shops, skipped_rows, \
                             warning_count, imported_at, elapsed_ms";

impl ShopRevenueRepository {
    /// 创建新的仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 月度营收 =====

    /// 写入单条月度营收（后写覆盖）
    pub fn upsert_revenue(&self, revenue: &ShopPeriodRevenue) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        upsert_revenue_row(&conn, revenue, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// 批量写入月度营收（单事务）
    pub fn upsert_revenues(&self, revenues: &[ShopPeriodRevenue]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        for revenue in revenues {
            upsert_revenue_row(&tx, revenue, &now)?;
        }
        tx.commit()?;
        Ok(revenues.len())
    }

    pub fn find_revenue(&self, shop_id: &str, period: ReportPeriod) -> RepositoryResult<Option<ShopPeriodRevenue>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shop_period_revenue WHERE shop_id = ?1 AND period = ?2",
            REVENUE_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![shop_id, period.to_string()], revenue_from_row)
            .optional()?;
        row.transpose()
    }

    pub fn list_revenues_by_period(&self, period: ReportPeriod) -> RepositoryResult<Vec<ShopPeriodRevenue>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM shop_period_revenue WHERE period = ?1 ORDER BY shop_id",
            REVENUE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![period.to_string()], revenue_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row??);
        }
        Ok(result)
    }

    /// 删除某月份的全部营收与综合报表
    pub fn delete_period(&self, period: ReportPeriod) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let key = period.to_string();
        let removed = tx.execute("DELETE FROM shop_period_revenue WHERE period = ?1", params![key])?;
        tx.execute("DELETE FROM comprehensive_report WHERE period = ?1", params![key])?;
        tx.commit()?;
        info!(period = %period, removed, "月度营收已清除");
        Ok(removed)
    }

    // ===== 综合报表 =====

    pub fn upsert_report(&self, report: &ComprehensiveReport) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        upsert_report_row(&conn, report, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    pub fn find_report(&self, shop_id: &str, period: ReportPeriod) -> RepositoryResult<Option<ComprehensiveReport>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT shop_id, period, shop_name, metrics_json, source_rows, source_batch_id \
                 FROM comprehensive_report WHERE shop_id = ?1 AND period = ?2",
                params![shop_id, period.to_string()],
                report_from_row,
            )
            .optional()?;
        row.transpose()
    }

    pub fn list_reports_by_period(&self, period: ReportPeriod) -> RepositoryResult<Vec<ComprehensiveReport>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT shop_id, period, shop_name, metrics_json, source_rows, source_batch_id \
             FROM comprehensive_report WHERE period = ?1 ORDER BY shop_id",
        )?;
        let rows = stmt.query_map(params![period.to_string()], report_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row??);
        }
        Ok(result)
    }

    // ===== 导入批次 =====

    pub fn find_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM import_batch WHERE batch_id = ?1", BATCH_COLUMNS);
        let row = conn.query_row(&sql, params![batch_id], batch_from_row).optional()?;
        row.transpose()
    }

    /// 最近的导入批次（按导入时间倒序）
    pub fn list_recent_batches(&self, period: Option<ReportPeriod>, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_batch WHERE (?1 IS NULL OR period = ?1) \
             ORDER BY imported_at DESC LIMIT ?2",
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![period.map(|p| p.to_string()), limit as i64],
            batch_from_row,
        )?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row??);
        }
        Ok(result)
    }

    fn save_import_sync(
        &self,
        batch: &ImportBatch,
        revenues: &[ShopPeriodRevenue],
        reports: &[ComprehensiveReport],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = batch.imported_at.to_rfc3339();

        insert_batch_row(&tx, batch)?;
        for revenue in revenues {
            upsert_revenue_row(&tx, revenue, &now)?;
        }
        for report in reports {
            upsert_report_row(&tx, report, &now)?;
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(batch_id = %batch.batch_id, shops = revenues.len(), "导入结果已落库");
        Ok(revenues.len())
    }
}

#[async_trait]
impl ReportImportRepository for ShopRevenueRepository {
    async fn save_import(
        &self,
        batch: &ImportBatch,
        revenues: &[ShopPeriodRevenue],
        reports: &[ComprehensiveReport],
    ) -> RepositoryResult<usize> {
        self.save_import_sync(batch, revenues, reports)
    }
}

// ==========================================
// 行读写辅助
// ==========================================

fn upsert_revenue_row(conn: &Connection, revenue: &ShopPeriodRevenue, now: &str) -> RepositoryResult<()> {
    let c = &revenue.components;
    conn.execute(
        REVENUE_UPSERT_SQL,
        params![
            revenue.shop_id,
            revenue.period.to_string(),
            c.total_revenue,
            c.cancelled_revenue,
            c.returned_revenue,
            c.platform_subsidized_revenue.filter(|v| *v > 0),
            revenue.source_batch_id,
            now,
        ],
    )?;
    Ok(())
}

fn upsert_report_row(conn: &Connection, report: &ComprehensiveReport, now: &str) -> RepositoryResult<()> {
    let metrics_json = serde_json::to_string(&report.metrics)
        .map_err(|e| field_error("metrics_json", e))?;
    conn.execute(
        REPORT_UPSERT_SQL,
        params![
            report.shop_id,
            report.period.to_string(),
            report.shop_name,
            metrics_json,
            report.source_rows as i64,
            report.source_batch_id,
            now,
        ],
    )?;
    Ok(())
}

fn insert_batch_row(tx: &Transaction<'_>, batch: &ImportBatch) -> RepositoryResult<()> {
    tx.execute(
        &format!(
            "INSERT INTO import_batch ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            BATCH_COLUMNS
        ),
        params![
            batch.batch_id,
            batch.period.to_string(),
            batch.file_name,
            batch.total_rows as i64,
            batch.imported_shops as i64,
            batch.skipped_rows as i64,
            batch.warning_count as i64,
            batch.imported_at.to_rfc3339(),
            batch.elapsed_ms,
        ],
    )?;
    Ok(())
}

fn parse_period(field: &str, raw: &str) -> RepositoryResult<ReportPeriod> {
    raw.parse::<ReportPeriod>().map_err(|e| field_error(field, e))
}

/// 外层 Result 给 rusqlite，内层 Result 承载领域转换错误
fn revenue_from_row(row: &Row<'_>) -> rusqlite::Result<RepositoryResult<ShopPeriodRevenue>> {
    let period_raw: String = row.get(1)?;
    let components = RevenueComponents {
        total_revenue: row.get(2)?,
        cancelled_revenue: row.get(3)?,
        returned_revenue: row.get(4)?,
        platform_subsidized_revenue: row.get(5)?,
    };
    let shop_id: String = row.get(0)?;
    let source_batch_id: Option<String> = row.get(6)?;
    Ok(parse_period("period", &period_raw).map(|period| ShopPeriodRevenue {
        shop_id,
        period,
        components,
        source_batch_id,
    }))
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<RepositoryResult<ComprehensiveReport>> {
    let shop_id: String = row.get(0)?;
    let period_raw: String = row.get(1)?;
    let shop_name: Option<String> = row.get(2)?;
    let metrics_raw: String = row.get(3)?;
    let source_rows: i64 = row.get(4)?;
    let source_batch_id: Option<String> = row.get(5)?;

    Ok((|| -> RepositoryResult<ComprehensiveReport> {
        let period = parse_period("period", &period_raw)?;
        let metrics: ReportMetrics =
            serde_json::from_str(&metrics_raw).map_err(|e| field_error("metrics_json", e))?;
        Ok(ComprehensiveReport {
            shop_id,
            shop_name,
            period,
            metrics,
            source_rows: source_rows.max(0) as usize,
            source_batch_id,
        })
    })())
}

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<RepositoryResult<ImportBatch>> {
    let batch_id: String = row.get(0)?;
    let period_raw: String = row.get(1)?;
    let file_name: Option<String> = row.get(2)?;
    let counts: [i64; 4] = [row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?];
    let imported_raw: String = row.get(7)?;
    let elapsed_ms: i64 = row.get(8)?;

    Ok((|| -> RepositoryResult<ImportBatch> {
        let period = parse_period("period", &period_raw)?;
        let imported_at = DateTime::parse_from_rfc3339(&imported_raw)
            .map_err(|e| field_error("imported_at", e))?
            .with_timezone(&Utc);
        Ok(ImportBatch {
            batch_id,
            period,
            file_name,
            total_rows: counts[0].max(0) as usize,
            imported_shops: counts[1].max(0) as usize,
            skipped_rows: counts[2].max(0) as usize,
            warning_count: counts[3].max(0) as usize,
            imported_at,
            elapsed_ms,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn repo() -> ShopRevenueRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        ShopRevenueRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn period() -> ReportPeriod {
        ReportPeriod::new(2025, 9).unwrap()
    }

    fn batch(id: &str) -> ImportBatch {
        ImportBatch {
            batch_id: id.to_string(),
            period: period(),
            file_name: Some("bao_cao.csv".to_string()),
            total_rows: 2,
            imported_shops: 1,
            skipped_rows: 0,
            warning_count: 0,
            imported_at: Utc::now(),
            elapsed_ms: 12,
        }
    }

    #[test]
    fn test_upsert_revenue_last_write_wins() {
        let repo = repo();
        repo.upsert_revenue(&ShopPeriodRevenue::new("S1", period(), RevenueComponents::new(1000, 0, 0)))
            .unwrap();
        repo.upsert_revenue(&ShopPeriodRevenue::new("S1", period(), RevenueComponents::new(2000, 0, 0)))
            .unwrap();

        let all = repo.list_revenues_by_period(period()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].components.total_revenue, 2000);
        assert_eq!(all[0].components.platform_subsidized_revenue, None);
    }

    #[test]
    fn test_find_revenue_missing() {
        let repo = repo();
        assert!(repo.find_revenue("S404", period()).unwrap().is_none());
    }

    #[test]
    fn test_save_import_roundtrip() {
        let repo = repo();
        let mut revenue = ShopPeriodRevenue::new("S1", period(), RevenueComponents::new(500, 50, 25));
        revenue.source_batch_id = Some("B1".to_string());
        let report = ComprehensiveReport {
            shop_id: "S1".to_string(),
            shop_name: Some("Shop Một".to_string()),
            period: period(),
            metrics: ReportMetrics {
                total_revenue: 500,
                conversion_rate: 2.5,
                ..Default::default()
            },
            source_rows: 2,
            source_batch_id: Some("B1".to_string()),
        };

        let saved = futures::executor::block_on(repo.save_import(&batch("B1"), &[revenue], &[report]))
            .unwrap();
        assert_eq!(saved, 1);

        let stored = repo.find_report("S1", period()).unwrap().unwrap();
        assert_eq!(stored.metrics.conversion_rate, 2.5);
        assert_eq!(stored.source_rows, 2);

        let batches = repo.list_recent_batches(Some(period()), 10).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].file_name.as_deref(), Some("bao_cao.csv"));
        assert!(repo.find_batch("B1").unwrap().is_some());
        assert!(repo.list_recent_batches(ReportPeriod::new(2025, 8), 10).unwrap().is_empty());
    }

    #[test]
    fn test_save_import_duplicate_batch_rolls_back() {
        let repo = repo();
        let revenue = ShopPeriodRevenue::new("S1", period(), RevenueComponents::new(1, 0, 0));
        futures::executor::block_on(repo.save_import(&batch("B1"), &[revenue.clone()], &[])).unwrap();

        let changed = ShopPeriodRevenue::new("S1", period(), RevenueComponents::new(999, 0, 0));
        let err = futures::executor::block_on(repo.save_import(&batch("B1"), &[changed], &[]));
        assert!(err.is_err());
        // 事务回滚，旧值保留
        assert_eq!(
            repo.find_revenue("S1", period()).unwrap().unwrap().components.total_revenue,
            1
        );
    }

    #[test]
    fn test_delete_period() {
        let repo = repo();
        repo.upsert_revenues(&[
            ShopPeriodRevenue::new("S1", period(), RevenueComponents::new(1, 0, 0)),
            ShopPeriodRevenue::new("S2", period(), RevenueComponents::new(2, 0, 0)),
        ])
        .unwrap();
        assert_eq!(repo.delete_period(period()).unwrap(), 2);
        assert!(repo.list_revenues_by_period(period()).unwrap().is_empty());
    }
}
