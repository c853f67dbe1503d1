// ==========================================
// 店铺营收分级引擎 - 报表导入 Trait
// ==========================================
// 职责: 定义综合报表导入接口（不包含实现）
// ==========================================

use crate::domain::report::{ImportOutcome, UploadRow};
use crate::domain::types::ReportPeriod;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ==========================================
// ImportRequest - 导入请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub period: ReportPeriod,            // 目标月份
    pub default_shop_id: Option<String>, // 行内无店铺 ID 时使用（单店报表）
    pub file_name: Option<String>,       // 仅用于批次记录
}

impl ImportRequest {
    pub fn new(period: ReportPeriod) -> Self {
        Self {
            period,
            default_shop_id: None,
            file_name: None,
        }
    }

    pub fn with_default_shop(mut self, shop_id: impl Into<String>) -> Self {
        self.default_shop_id = Some(shop_id.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

// ==========================================
// ReportImporter Trait
// ==========================================
// 实现者: ReportImporterImpl
#[async_trait]
pub trait ReportImporter: Send + Sync {
    /// 从文件（.csv / .xlsx）导入综合报表
    ///
    /// # 导入流程
    /// 1. 文件解析（首行表头，空行跳过）
    /// 2. 列映射 + 单元格规范化（异常值按 0 处理并记录诊断）
    /// 3. 按店铺合并为月度记录
    /// 4. 单事务落库（(shop_id, period) 后写覆盖）+ 批次记录
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        request: ImportRequest,
    ) -> ImportResult<ImportOutcome>;

    /// 导入已解析的上传行（前端直接提交的 JSON 行）
    async fn import_rows(&self, rows: Vec<UploadRow>, request: ImportRequest) -> ImportResult<ImportOutcome>;

    /// 批量导入多个文件（并发执行）
    ///
    /// 每个文件独立导入，某个文件失败不影响其他文件
    async fn batch_import(&self, jobs: Vec<(PathBuf, ImportRequest)>) -> Vec<Result<ImportOutcome, String>>;
}
