// ==========================================
// 店铺营收分级引擎 - 店铺与人员目录仓储
// ==========================================
// 职责: shop / employee 表读写
// 说明: 店铺状态以越南语标签存储；无法识别的标签读回为未设置
// ==========================================

use crate::domain::personnel::{Employee, EmployeeDirectory, Shop};
use crate::domain::types::ShopStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct ShopDirectoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShopDirectoryRepository {
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

    // ===== 店铺 =====

    pub fn upsert_shops(&self, shops: &[Shop]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO shop (shop_id, shop_name, status, personnel_id, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(shop_id) DO UPDATE SET
                    shop_name = excluded.shop_name,
                    status = excluded.status,
                    personnel_id = excluded.personnel_id,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for shop in shops {
                stmt.execute(params![
                    shop.shop_id,
                    shop.shop_name,
                    shop.status.map(|s| s.as_stored()),
                    shop.personnel_id,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = shops.len(), "店铺目录已更新");
        Ok(shops.len())
    }

    pub fn find_shop(&self, shop_id: &str) -> RepositoryResult<Option<Shop>> {
        let conn = self.get_conn()?;
        let shop = conn
            .query_row(
                "SELECT shop_id, shop_name, status, personnel_id FROM shop WHERE shop_id = ?1",
                params![shop_id],
                shop_from_row,
            )
            .optional()?;
        Ok(shop)
    }

    /// 全部店铺（按 shop_id 升序）
    pub fn list_shops(&self) -> RepositoryResult<Vec<Shop>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT shop_id, shop_name, status, personnel_id FROM shop ORDER BY shop_id")?;
        let shops = stmt
            .query_map([], shop_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shops)
    }

    pub fn list_shops_by_personnel(&self, personnel_id: &str) -> RepositoryResult<Vec<Shop>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT shop_id, shop_name, status, personnel_id FROM shop \
             WHERE personnel_id = ?1 ORDER BY shop_id",
        )?;
        let shops = stmt
            .query_map(params![personnel_id], shop_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shops)
    }

    // ===== 人员 =====

    pub fn upsert_employees(&self, employees: &[Employee]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO employee (employee_id, name, manager_id) VALUES (?1, ?2, ?3)
                ON CONFLICT(employee_id) DO UPDATE SET
                    name = excluded.name,
                    manager_id = excluded.manager_id
                "#,
            )?;
            for employee in employees {
                stmt.execute(params![employee.id, employee.name, employee.manager_id])?;
            }
        }
        tx.commit()?;
        Ok(employees.len())
    }

    pub fn list_employees(&self) -> RepositoryResult<Vec<Employee>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT employee_id, name, manager_id FROM employee ORDER BY employee_id")?;
        let employees = stmt
            .query_map([], |row| {
                Ok(Employee {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    manager_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(employees)
    }

    /// 人员索引（供 Leader 分组使用）
    pub fn load_directory(&self) -> RepositoryResult<EmployeeDirectory> {
        Ok(EmployeeDirectory::new(self.list_employees()?))
    }
}

fn shop_from_row(row: &Row<'_>) -> rusqlite::Result<Shop> {
    let status: Option<String> = row.get(2)?;
    Ok(Shop {
        shop_id: row.get(0)?,
        shop_name: row.get(1)?,
        status: status.as_deref().and_then(ShopStatus::parse_lenient),
        personnel_id: row.get(3)?,
    })
}
