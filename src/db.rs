// ==========================================
// 店铺营收分级引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等（CREATE TABLE IF NOT EXISTS），启动时可重复执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 默认数据库文件名
pub const DEFAULT_DB_FILE_NAME: &str = "shop_revenue.db";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS employee (
    employee_id   TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    manager_id    TEXT
);

CREATE TABLE IF NOT EXISTS shop (
    shop_id       TEXT PRIMARY KEY,
    shop_name     TEXT NOT NULL,
    status        TEXT,
    personnel_id  TEXT,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shop_period_revenue (
    shop_id                     TEXT NOT NULL,
    period                      TEXT NOT NULL,
    total_revenue               INTEGER NOT NULL DEFAULT 0,
    cancelled_revenue           INTEGER NOT NULL DEFAULT 0,
    returned_revenue            INTEGER NOT NULL DEFAULT 0,
    platform_subsidized_revenue INTEGER,
    source_batch_id             TEXT,
    updated_at                  TEXT NOT NULL,
    PRIMARY KEY (shop_id, period)
);

CREATE TABLE IF NOT EXISTS goal_threshold (
    shop_id            TEXT NOT NULL,
    period             TEXT NOT NULL,
    feasible_goal      INTEGER,
    breakthrough_goal  INTEGER,
    updated_at         TEXT NOT NULL,
    PRIMARY KEY (shop_id, period)
);

CREATE TABLE IF NOT EXISTS comprehensive_report (
    shop_id          TEXT NOT NULL,
    period           TEXT NOT NULL,
    shop_name        TEXT,
    metrics_json     TEXT NOT NULL,
    source_rows      INTEGER NOT NULL DEFAULT 0,
    source_batch_id  TEXT,
    updated_at       TEXT NOT NULL,
    PRIMARY KEY (shop_id, period)
);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id        TEXT PRIMARY KEY,
    period          TEXT NOT NULL,
    file_name       TEXT,
    total_rows      INTEGER NOT NULL,
    imported_shops  INTEGER NOT NULL,
    skipped_rows    INTEGER NOT NULL,
    warning_count   INTEGER NOT NULL,
    imported_at     TEXT NOT NULL,
    elapsed_ms      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL,
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (scope_id, key)
);

CREATE INDEX IF NOT EXISTS idx_revenue_period ON shop_period_revenue(period);
CREATE INDEX IF NOT EXISTS idx_goal_period ON goal_threshold(period);
CREATE INDEX IF NOT EXISTS idx_batch_period ON import_batch(period, imported_at);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys / busy_timeout 需要每个连接单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;

    match read_schema_version(conn)? {
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            warn!(db_version = v, expected = CURRENT_SCHEMA_VERSION, "数据库版本高于程序版本");
        }
        v => info!(schema_version = ?v, "数据库结构就绪"),
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径（用户数据目录下；无法获取时退回当前目录）
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(crate::APP_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DB_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN \
                 ('shop','employee','shop_period_revenue','goal_threshold','comprehensive_report','import_batch','config_kv')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 7);
    }

    #[test]
    fn test_default_db_path_file_name() {
        let path = default_db_path();
        assert!(path.ends_with(DEFAULT_DB_FILE_NAME));
    }
}
