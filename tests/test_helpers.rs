// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据写入等功能
// ==========================================

#![allow(dead_code)]

use rusqlite::Connection;
use shop_revenue_engine::db::{init_schema, open_sqlite_connection};
use shop_revenue_engine::domain::personnel::{Employee, Shop};
use shop_revenue_engine::repository::ShopDirectoryRepository;
use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Arc<Mutex<Connection>>: 共享连接
pub fn create_test_db() -> Result<(NamedTempFile, Arc<Mutex<Connection>>), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("非 UTF-8 路径")?.to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, Arc::new(Mutex::new(conn))))
}

/// 写入店铺与人员目录
pub fn seed_directory(
    conn: &Arc<Mutex<Connection>>,
    shops: &[Shop],
    employees: &[Employee],
) -> Result<(), Box<dyn Error>> {
    let repo = ShopDirectoryRepository::from_connection(conn.clone());
    repo.upsert_employees(employees)?;
    repo.upsert_shops(shops)?;
    Ok(())
}

/// 写入临时 CSV 文件（保留 .csv 扩展名）
pub fn write_csv(content: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}
