// ==========================================
// 店铺营收分级引擎 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;

/// 配置读取结果（错误需可跨线程传递）
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 默认: 跳过导入月份之外的行
pub const DEFAULT_REJECT_OUT_OF_PERIOD_ROWS: bool = true;

/// 默认: 单批次最多保留的诊断条数
pub const DEFAULT_MAX_DIAGNOSTICS_PER_BATCH: usize = 500;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv 表）/ StaticImportConfig（内存）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 是否跳过日期不在导入月份内的行
    ///
    /// # 默认值
    /// - true
    async fn get_reject_out_of_period_rows(&self) -> ConfigResult<bool>;

    /// 额外的列标签别名（别名 → 标准列标签）
    ///
    /// # 默认值
    /// - {}
    async fn get_column_aliases(&self) -> ConfigResult<HashMap<String, String>>;

    /// 单批次诊断条数上限（超过后截断）
    ///
    /// # 默认值
    /// - 500
    async fn get_max_diagnostics_per_batch(&self) -> ConfigResult<usize>;
}

// ==========================================
// StaticImportConfig - 内存配置
// ==========================================
// 用途: 嵌入式调用与测试，不依赖数据库
#[derive(Debug, Clone)]
pub struct StaticImportConfig {
    pub reject_out_of_period_rows: bool,
    pub column_aliases: HashMap<String, String>,
    pub max_diagnostics_per_batch: usize,
}

impl Default for StaticImportConfig {
    fn default() -> Self {
        Self {
            reject_out_of_period_rows: DEFAULT_REJECT_OUT_OF_PERIOD_ROWS,
            column_aliases: HashMap::new(),
            max_diagnostics_per_batch: DEFAULT_MAX_DIAGNOSTICS_PER_BATCH,
        }
    }
}

#[async_trait]
impl ImportConfigReader for StaticImportConfig {
    async fn get_reject_out_of_period_rows(&self) -> ConfigResult<bool> {
        Ok(self.reject_out_of_period_rows)
    }

    async fn get_column_aliases(&self) -> ConfigResult<HashMap<String, String>> {
        Ok(self.column_aliases.clone())
    }

    async fn get_max_diagnostics_per_batch(&self) -> ConfigResult<usize> {
        Ok(self.max_diagnostics_per_batch)
    }
}
