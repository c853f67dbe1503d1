// ==========================================
// 店铺营收分级引擎 - 月度目标仓储
// ==========================================
// 职责: goal_threshold 表读写
// 红线: (shop_id, period) 唯一，后写覆盖
// ==========================================

use crate::domain::revenue::{GoalThresholds, ShopGoal};
use crate::domain::types::ReportPeriod;
use crate::repository::error::{field_error, RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct GoalRepository {
    conn: Arc<Mutex<Connection>>,
}

const GOAL_UPSERT_SQL: &str = r#"
    INSERT INTO goal_threshold (shop_id, period, feasible_goal, breakthrough_goal, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(shop_id, period) DO UPDATE SET
        feasible_goal = excluded.feasible_goal,
        breakthrough_goal = excluded.breakthrough_goal,
        updated_at = excluded.updated_at
"#;

impl GoalRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入单店月度目标
    pub fn upsert_goal(&self, goal: &ShopGoal) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            GOAL_UPSERT_SQL,
            params![
                goal.shop_id,
                goal.period.to_string(),
                goal.thresholds.feasible_goal,
                goal.thresholds.breakthrough_goal,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 批量写入（单事务）
    pub fn upsert_goals(&self, goals: &[ShopGoal]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(GOAL_UPSERT_SQL)?;
            for goal in goals {
                stmt.execute(params![
                    goal.shop_id,
                    goal.period.to_string(),
                    goal.thresholds.feasible_goal,
                    goal.thresholds.breakthrough_goal,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(goals.len())
    }

    pub fn find_goal(&self, shop_id: &str, period: ReportPeriod) -> RepositoryResult<Option<GoalThresholds>> {
        let conn = self.get_conn()?;
        let thresholds = conn
            .query_row(
                "SELECT feasible_goal, breakthrough_goal FROM goal_threshold WHERE shop_id = ?1 AND period = ?2",
                params![shop_id, period.to_string()],
                |row| Ok(GoalThresholds::new(row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(thresholds)
    }

    pub fn list_goals_by_period(&self, period: ReportPeriod) -> RepositoryResult<Vec<ShopGoal>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT shop_id, period, feasible_goal, breakthrough_goal FROM goal_threshold \
             WHERE period = ?1 ORDER BY shop_id",
        )?;
        let rows = stmt.query_map(params![period.to_string()], goal_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row??);
        }
        Ok(result)
    }
}

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<RepositoryResult<ShopGoal>> {
    let shop_id: String = row.get(0)?;
    let period_raw: String = row.get(1)?;
    let thresholds = GoalThresholds::new(row.get(2)?, row.get(3)?);
    Ok(period_raw
        .parse::<ReportPeriod>()
        .map_err(|e| field_error("period", e))
        .map(|period| ShopGoal {
            shop_id,
            period,
            thresholds,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn repo() -> GoalRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        GoalRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn goal(shop: &str, feasible: Option<i64>, breakthrough: Option<i64>) -> ShopGoal {
        ShopGoal {
            shop_id: shop.to_string(),
            period: ReportPeriod::new(2025, 9).unwrap(),
            thresholds: GoalThresholds::new(feasible, breakthrough),
        }
    }

    #[test]
    fn test_upsert_and_find_goal() {
        let repo = repo();
        repo.upsert_goal(&goal("S1", Some(100), Some(200))).unwrap();
        repo.upsert_goal(&goal("S1", Some(150), None)).unwrap();

        let found = repo
            .find_goal("S1", ReportPeriod::new(2025, 9).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(found.feasible_goal, Some(150));
        assert_eq!(found.breakthrough_goal, None);
        assert!(repo
            .find_goal("S1", ReportPeriod::new(2025, 10).unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_goals_by_period() {
        let repo = repo();
        repo.upsert_goals(&[goal("S2", Some(1), None), goal("S1", None, None)])
            .unwrap();
        let goals = repo
            .list_goals_by_period(ReportPeriod::new(2025, 9).unwrap())
            .unwrap();
        assert_eq!(goals.len(), 2);
        assert_eq!(goals[0].shop_id, "S1");
        assert_eq!(goals[0].thresholds.feasible_goal, None);
    }
}
