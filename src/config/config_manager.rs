// ==========================================
// 店铺营收分级引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)，当前只使用 global scope
// 约定: 配置值格式错误时记录告警并回退默认值（列别名除外，格式错误直接报错）
// ==========================================

use crate::config::import_config_trait::{
    ConfigResult, ImportConfigReader, DEFAULT_MAX_DIAGNOSTICS_PER_BATCH,
    DEFAULT_REJECT_OUT_OF_PERIOD_ROWS,
};
use crate::db::open_sqlite_connection;
use crate::engine::goal_classifier::{ClassifierConfig, DEFAULT_RED_FLOOR_PERCENT};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::warn;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![GLOBAL_SCOPE, key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON，键有序）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(serde_json::to_string(&config_map)?)
    }

    // ===== 分级配置 =====

    /// 红色区间下限（可行目标的百分比，取值 1..=99）
    pub fn get_red_floor_percent(&self) -> ConfigResult<u32> {
        let default = DEFAULT_RED_FLOOR_PERCENT.to_string();
        let value = self.get_config_or_default(config_keys::RED_FLOOR_PERCENT, &default)?;
        match value.trim().parse::<u32>() {
            Ok(v) if (1..100).contains(&v) => Ok(v),
            _ => {
                warn!(
                    config_key = config_keys::RED_FLOOR_PERCENT,
                    raw_value = %value,
                    "红色区间下限配置无效，使用默认值"
                );
                Ok(DEFAULT_RED_FLOOR_PERCENT)
            }
        }
    }

    /// 加载分级器配置
    pub fn load_classifier_config(&self) -> ConfigResult<ClassifierConfig> {
        Ok(ClassifierConfig {
            red_floor_percent: self.get_red_floor_percent()?,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_reject_out_of_period_rows(&self) -> ConfigResult<bool> {
        let Some(value) = self.get_config_value(config_keys::REJECT_OUT_OF_PERIOD_ROWS)? else {
            return Ok(DEFAULT_REJECT_OUT_OF_PERIOD_ROWS);
        };
        Ok(parse_bool(&value).unwrap_or_else(|| {
            warn!(
                config_key = config_keys::REJECT_OUT_OF_PERIOD_ROWS,
                raw_value = %value,
                "布尔配置格式错误，使用默认值"
            );
            DEFAULT_REJECT_OUT_OF_PERIOD_ROWS
        }))
    }

    async fn get_column_aliases(&self) -> ConfigResult<HashMap<String, String>> {
        let value = self.get_config_or_default(config_keys::COLUMN_ALIASES, "{}")?;
        let aliases: HashMap<String, String> = serde_json::from_str(&value)
            .map_err(|e| format!("{} 不是合法的 JSON 对象: {}", config_keys::COLUMN_ALIASES, e))?;
        Ok(aliases)
    }

    async fn get_max_diagnostics_per_batch(&self) -> ConfigResult<usize> {
        let default = DEFAULT_MAX_DIAGNOSTICS_PER_BATCH.to_string();
        let value = self.get_config_or_default(config_keys::MAX_DIAGNOSTICS_PER_BATCH, &default)?;
        Ok(value.trim().parse::<usize>().unwrap_or_else(|_| {
            warn!(
                config_key = config_keys::MAX_DIAGNOSTICS_PER_BATCH,
                raw_value = %value,
                "诊断上限配置格式错误，使用默认值"
            );
            DEFAULT_MAX_DIAGNOSTICS_PER_BATCH
        }))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 分级
    pub const RED_FLOOR_PERCENT: &str = "red_floor_percent";

    // 导入
    pub const REJECT_OUT_OF_PERIOD_ROWS: &str = "reject_out_of_period_rows";
    pub const COLUMN_ALIASES: &str = "column_aliases"; // JSON: {"别名": "标准列标签"}
    pub const MAX_DIAGNOSTICS_PER_BATCH: &str = "max_diagnostics_per_batch";
}
